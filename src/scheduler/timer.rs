//! Tick-based countdown timers.
//!
//! Timers are keyed by `(owning service, timer id)` and count scheduler
//! ticks. The scheduler calls [`TimerService::advance`] once per tick and
//! posts a `Timeout(id)` to the owner of every timer that reached zero.

use crate::core::{ServiceId, TimerId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors returned by [`TimerService::start`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("No service registered as {0}")]
    UnknownService(ServiceId),

    #[error("{timer} on {service} started with zero ticks")]
    ZeroTicks { service: ServiceId, timer: TimerId },

    #[error("All {0} timer slots are in use")]
    Exhausted(usize),
}

/// Manages the countdown timers of every service.
#[derive(Debug, Clone)]
pub struct TimerService {
    active: BTreeMap<(ServiceId, TimerId), u32>,
    owners: BTreeSet<ServiceId>,
    max_timers: usize,
}

impl TimerService {
    pub fn new(max_timers: usize) -> Self {
        Self {
            active: BTreeMap::new(),
            owners: BTreeSet::new(),
            max_timers,
        }
    }

    /// Allow `service` to own timers.
    pub fn register(&mut self, service: ServiceId) {
        self.owners.insert(service);
    }

    /// Arm a timer that expires after `ticks` calls to [`advance`](Self::advance).
    ///
    /// If the timer is already running its remaining count is replaced.
    pub fn start(
        &mut self,
        service: ServiceId,
        timer: TimerId,
        ticks: u32,
    ) -> Result<(), TimerError> {
        if !self.owners.contains(&service) {
            return Err(TimerError::UnknownService(service));
        }
        if ticks == 0 {
            return Err(TimerError::ZeroTicks { service, timer });
        }
        let key = (service, timer);
        if !self.active.contains_key(&key) && self.active.len() >= self.max_timers {
            return Err(TimerError::Exhausted(self.max_timers));
        }
        self.active.insert(key, ticks);
        debug!(%service, %timer, ticks, "Timer set");
        Ok(())
    }

    /// Cancel a timer.
    ///
    /// If the timer doesn't exist or has already fired, this is a no-op.
    /// Returns whether a running timer was cancelled.
    pub fn stop(&mut self, service: ServiceId, timer: TimerId) -> bool {
        let removed = self.active.remove(&(service, timer)).is_some();
        if removed {
            debug!(%service, %timer, "Timer cancelled");
        }
        removed
    }

    /// Cancel every timer owned by `service`.
    pub fn stop_all(&mut self, service: ServiceId) {
        self.active.retain(|(owner, timer), _| {
            let keep = *owner != service;
            if !keep {
                trace!(%owner, %timer, "Timer cancelled (stop_all)");
            }
            keep
        });
    }

    /// Decrement every active timer by one tick.
    ///
    /// Returns the expired timers in ascending `(service, timer)` order;
    /// they are no longer active.
    pub fn advance(&mut self) -> Vec<(ServiceId, TimerId)> {
        let mut expired = Vec::new();
        for (key, remaining) in self.active.iter_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                expired.push(*key);
            }
        }
        for key in &expired {
            self.active.remove(key);
            debug!(service = %key.0, timer = %key.1, "Timer expired");
        }
        expired
    }

    pub fn remaining(&self, service: ServiceId, timer: TimerId) -> Option<u32> {
        self.active.get(&(service, timer)).copied()
    }

    pub fn is_active(&self, service: ServiceId, timer: TimerId) -> bool {
        self.active.contains_key(&(service, timer))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_timers
    }
}
