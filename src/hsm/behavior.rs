//! The two traits every node is written against.
//!
//! [`Behavior`] is what an application writes: a state enum and a handler
//! table. [`HsmNode`] is what the engine drives: the recursive `run`
//! protocol, implemented once by [`Machine`](super::Machine).

use super::context::Context;
use crate::builder::TopologyViolation;
use crate::core::{Event, Signal, State};

/// Result of one handler invocation.
///
/// The rewritten event and the requested next state travel together, so a
/// transition can never be flagged without a target.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Handled<S, A> {
    /// Event as returned to the caller of `run`
    pub event: Event<A>,
    /// Requested transition, if any
    pub next: Option<S>,
}

impl<S, A: Signal> Handled<S, A> {
    /// Event consumed, no transition.
    pub fn consumed() -> Self {
        Self {
            event: Event::none(),
            next: None,
        }
    }

    /// State not interested; the event bubbles up unchanged.
    pub fn ignored(event: Event<A>) -> Self {
        Self { event, next: None }
    }

    /// Event consumed and a transition to `next` requested.
    pub fn transition(next: S) -> Self {
        Self {
            event: Event::none(),
            next: Some(next),
        }
    }

    /// Event rewritten to `event` for the parent, no transition.
    pub fn rewritten(event: Event<A>) -> Self {
        Self { event, next: None }
    }

    pub fn is_transition(&self) -> bool {
        self.next.is_some()
    }
}

/// Per-node behavior: states plus the `(state, event) -> action` table.
///
/// Handlers run side effects through `ctx` and return a [`Handled`]. They
/// receive `Entry` and `Exit` for setup and cleanup after the active child
/// has had them. Returning `Entry`/`Exit` unconsumed hands them to the
/// parent; a requested transition is ignored.
///
/// # Example
///
/// ```rust
/// use tickstate::core::Event;
/// use tickstate::hsm::{Behavior, Context, Handled};
/// use tickstate::{signal_enum, state_enum};
///
/// signal_enum! {
///     pub enum DoorSignal { Push }
/// }
///
/// state_enum! {
///     pub enum DoorState {
///         InitPState,
///         Closed,
///         Open,
///     }
///     pseudo_initial: InitPState
/// }
///
/// struct Door;
///
/// impl Behavior<DoorSignal, ()> for Door {
///     type State = DoorState;
///
///     fn name(&self) -> &str { "Door" }
///
///     fn initial_state(&self) -> DoorState { DoorState::Closed }
///
///     fn handle(
///         &mut self,
///         state: &DoorState,
///         event: Event<DoorSignal>,
///         _ctx: &mut Context<'_, DoorSignal, ()>,
///     ) -> Handled<DoorState, DoorSignal> {
///         match state {
///             DoorState::Closed if event.is(DoorSignal::Push) => Handled::transition(DoorState::Open),
///             DoorState::Open if event.is(DoorSignal::Push) => Handled::transition(DoorState::Closed),
///             _ => Handled::ignored(event),
///         }
///     }
/// }
/// ```
pub trait Behavior<A: Signal, E> {
    type State: State;

    /// Node name for logging and traces.
    fn name(&self) -> &str;

    /// State entered when `Init` arrives in the pseudo-initial state.
    fn initial_state(&self) -> Self::State;

    /// One-time setup run on `Init`, before the initial state's `Entry`.
    fn on_init(&mut self, _ctx: &mut Context<'_, A, E>) {}

    /// Clear per-activation data when the node is reset.
    fn on_reset(&mut self) {}

    fn handle(
        &mut self,
        state: &Self::State,
        event: Event<A>,
        ctx: &mut Context<'_, A, E>,
    ) -> Handled<Self::State, A>;
}

/// One level of the hierarchy as seen by its parent or the scheduler.
pub trait HsmNode<A: Signal, E> {
    /// Dispatch `event` through this subtree and return what is left of it.
    ///
    /// `NoEvent` means some level consumed the event.
    fn run(&mut self, event: Event<A>, ctx: &mut Context<'_, A, E>) -> Event<A>;

    /// Return this node and its children to their pseudo-initial states.
    fn reset(&mut self);

    fn name(&self) -> &str;

    fn state_name(&self) -> &str;

    /// False while in the pseudo-initial state.
    fn is_initialized(&self) -> bool;

    /// Current state names from this node down to the active leaf.
    fn active_states(&self) -> Vec<&str>;

    /// Number of completed transitions at this level.
    fn transition_count(&self) -> usize;

    /// Structural problems in this subtree.
    fn violations(&self) -> Vec<TopologyViolation> {
        Vec::new()
    }

    /// Transition trace of this level as JSON.
    fn history_json(&self) -> serde_json::Result<serde_json::Value> {
        Ok(serde_json::Value::Array(Vec::new()))
    }
}
