//! Per-tick and cumulative scheduler counters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened during one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Index of the tick, starting at zero
    pub tick: u64,
    /// Events posted by checkers
    pub checker_events: usize,
    /// Timeout events posted by expired timers
    pub timer_events: usize,
    /// Events handed to root nodes
    pub dispatched: usize,
    /// Dispatched events no node consumed
    pub unhandled: usize,
    /// Checker/timer events lost to full queues
    pub dropped: usize,
    pub elapsed: Duration,
    /// Whether `elapsed` exceeded the configured budget
    pub overrun: bool,
}

/// Totals since the scheduler was built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub dispatched: u64,
    pub unhandled: u64,
    pub dropped: u64,
    pub budget_overruns: u64,
    pub max_tick: Duration,
}

impl SchedulerStats {
    pub fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.dispatched += report.dispatched as u64;
        self.unhandled += report.unhandled as u64;
        self.dropped += report.dropped as u64;
        if report.overrun {
            self.budget_overruns += 1;
        }
        self.max_tick = self.max_tick.max(report.elapsed);
    }
}
