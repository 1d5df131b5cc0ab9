//! Builder API for assembling a scheduler and declaring node types.
//!
//! This module provides the validated [`SchedulerBuilder`] and the
//! `state_enum!` / `signal_enum!` macros that remove most of the boilerplate
//! of writing a behavior tree.

pub mod error;
pub mod macros;
pub mod scheduler;

pub use error::{BuildError, TopologyViolation};
pub use scheduler::SchedulerBuilder;
