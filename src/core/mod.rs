//! Core value types shared by every layer of the engine.
//!
//! This module contains:
//! - Events, application signals and the service/timer identifiers
//! - The `State` trait implemented by each node's state enum
//! - Immutable transition history
//!
//! Nothing in this module performs side effects.

mod event;
mod history;
mod state;

pub use event::{Event, EventKind, ServiceId, Signal, TimerId};
pub use history::{StateHistory, StateTransition};
pub use state::State;
