//! Tickstate: hierarchical state machines on a cooperative tick scheduler
//!
//! Tickstate runs a tree of state machines the way small robots and
//! embedded controllers do: one thread, no preemption, every event handled
//! to completion before the next one is looked at.
//!
//! # Core Concepts
//!
//! - **Event**: a tag plus an integer parameter, passed by value
//! - **Node**: one level of the hierarchy ([`hsm::Machine`] running a [`hsm::Behavior`]);
//!   children see every event before their parent
//! - **Service**: a prioritized root node with its own bounded queue
//! - **Tick**: poll checkers, advance timers, dispatch queued events in
//!   ascending service order
//!
//! # Example
//!
//! ```rust
//! use tickstate::builder::SchedulerBuilder;
//! use tickstate::core::{Event, EventKind, ServiceId, TimerId};
//! use tickstate::hsm::{Behavior, Context, Handled, Machine};
//! use tickstate::{signal_enum, state_enum};
//!
//! signal_enum! {
//!     pub enum LampSignal { Toggle }
//! }
//!
//! state_enum! {
//!     pub enum LampState { InitPState, Off, On }
//!     pseudo_initial: InitPState
//! }
//!
//! const AUTO_OFF: TimerId = TimerId(0);
//!
//! struct Lamp;
//!
//! impl Behavior<LampSignal, u32> for Lamp {
//!     type State = LampState;
//!
//!     fn name(&self) -> &str { "Lamp" }
//!
//!     fn initial_state(&self) -> LampState { LampState::Off }
//!
//!     fn handle(
//!         &mut self,
//!         state: &LampState,
//!         event: Event<LampSignal>,
//!         ctx: &mut Context<'_, LampSignal, u32>,
//!     ) -> Handled<LampState, LampSignal> {
//!         match (state, event.kind) {
//!             (LampState::On, EventKind::Entry) => {
//!                 *ctx.env() += 1;
//!                 ctx.arm(AUTO_OFF, 3);
//!                 Handled::consumed()
//!             }
//!             (LampState::Off, EventKind::Signal(LampSignal::Toggle)) => {
//!                 Handled::transition(LampState::On)
//!             }
//!             (LampState::On, EventKind::Timeout(AUTO_OFF)) => {
//!                 Handled::transition(LampState::Off)
//!             }
//!             _ => Handled::ignored(event),
//!         }
//!     }
//! }
//!
//! let lamp = ServiceId(0);
//! let mut scheduler = SchedulerBuilder::new()
//!     .service(lamp, Machine::new(Lamp))
//!     .build(0u32)
//!     .unwrap();
//!
//! scheduler.start().unwrap();
//! scheduler.post(lamp, Event::signal(LampSignal::Toggle, 0)).unwrap();
//! scheduler.tick().unwrap();
//! assert_eq!(scheduler.root(lamp).unwrap().state_name(), "On");
//!
//! scheduler.run_for(3).unwrap();
//! assert_eq!(scheduler.root(lamp).unwrap().state_name(), "Off");
//! assert_eq!(*scheduler.env(), 1);
//! ```

pub mod builder;
pub mod checker;
pub mod config;
pub mod core;
pub mod hsm;
pub mod ports;
pub mod robot;
pub mod scheduler;

// Re-export commonly used types
pub use builder::{BuildError, SchedulerBuilder};
pub use config::SchedulerConfig;
pub use core::{Event, EventKind, ServiceId, Signal, State, TimerId};
pub use hsm::{Behavior, Context, Handled, HsmNode, Machine};
pub use scheduler::{Scheduler, SchedulerError};
