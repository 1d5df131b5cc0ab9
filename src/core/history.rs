//! Transition trace of a single node.
//!
//! Every completed transition of a [`Machine`](crate::hsm::Machine) is
//! appended here, stamped with the scheduler tick and wall-clock time.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single completed transition.
///
/// # Example
///
/// ```rust
/// use tickstate::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum LampState {
///     InitPState,
///     Off,
///     On,
/// }
///
/// impl State for LampState {
///     fn name(&self) -> &str {
///         match self {
///             Self::InitPState => "InitPState",
///             Self::Off => "Off",
///             Self::On => "On",
///         }
///     }
///
///     fn pseudo_initial() -> Self {
///         Self::InitPState
///     }
/// }
///
/// let transition = StateTransition {
///     from: LampState::Off,
///     to: LampState::On,
///     tick: 42,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.tick, 42);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left
    pub from: S,
    /// The state being entered
    pub to: S,
    /// Scheduler tick during which the transition completed
    pub tick: u64,
    /// Wall-clock time of the transition
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of transitions.
///
/// History is immutable - `record` returns a new history with the
/// transition appended.
///
/// # Example
///
/// ```rust
/// use tickstate::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Phase { InitPState, Scan, Drive }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::InitPState => "InitPState",
///             Self::Scan => "Scan",
///             Self::Drive => "Drive",
///         }
///     }
///
///     fn pseudo_initial() -> Self { Self::InitPState }
/// }
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         from: Phase::InitPState,
///         to: Phase::Scan,
///         tick: 0,
///         timestamp: Utc::now(),
///     })
///     .record(StateTransition {
///         from: Phase::Scan,
///         to: Phase::Drive,
///         tick: 3,
///         timestamp: Utc::now(),
///     });
///
/// let path = history.get_path();
/// assert_eq!(path, vec![&Phase::InitPState, &Phase::Scan, &Phase::Drive]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The receiver is left untouched.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// States traversed in order: the first `from`, then every `to`.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Wall-clock time between the first and last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Ticks between the first and last transition.
    pub fn tick_span(&self) -> Option<u64> {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => Some(last.tick.saturating_sub(first.tick)),
            _ => None,
        }
    }

    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.last()
    }

    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
