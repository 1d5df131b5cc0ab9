//! Event queues, timers and the priority tick loop.

mod engine;
mod queue;
mod stats;
mod timer;

pub use engine::{Scheduler, SchedulerError};
pub use queue::{EventQueue, Mailboxes, PostError};
pub use stats::{SchedulerStats, TickReport};
pub use timer::{TimerError, TimerService};
