//! Handler-side view of the scheduler.

use crate::core::{Event, ServiceId, Signal, TimerId};
use crate::scheduler::{Mailboxes, PostError, TimerError, TimerService};
use tracing::warn;

/// What a node may touch while handling an event.
///
/// A context is created by the scheduler for one dispatch and borrowed by
/// every node along the `run` path. Events posted here are never seen in
/// the current tick: they wait in the destination queue for the next one.
pub struct Context<'a, A, E> {
    env: &'a mut E,
    mailboxes: &'a mut Mailboxes<A>,
    timers: &'a mut TimerService,
    service: ServiceId,
    tick: u64,
}

impl<'a, A: Signal, E> Context<'a, A, E> {
    pub fn new(
        env: &'a mut E,
        mailboxes: &'a mut Mailboxes<A>,
        timers: &'a mut TimerService,
        service: ServiceId,
        tick: u64,
    ) -> Self {
        Self {
            env,
            mailboxes,
            timers,
            service,
            tick,
        }
    }

    /// Actuators and sensors of the application.
    pub fn env(&mut self) -> &mut E {
        self.env
    }

    /// Service currently being dispatched.
    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn post(&mut self, service: ServiceId, event: Event<A>) -> Result<(), PostError> {
        self.mailboxes.post(service, event)
    }

    pub fn post_self(&mut self, event: Event<A>) -> Result<(), PostError> {
        self.mailboxes.post(self.service, event)
    }

    /// Post to the dispatching service, dropping the event if its queue is full.
    ///
    /// Returns whether the event was queued.
    pub fn emit(&mut self, event: Event<A>) -> bool {
        match self.post_self(event) {
            Ok(()) => true,
            Err(error) => {
                warn!(service = %self.service, tick = self.tick, %error, "Event dropped");
                false
            }
        }
    }

    /// Arm a timer owned by the dispatching service.
    pub fn start_timer(&mut self, timer: TimerId, ticks: u32) -> Result<(), TimerError> {
        self.timers.start(self.service, timer, ticks)
    }

    /// Like [`start_timer`](Self::start_timer), logging instead of returning failures.
    pub fn arm(&mut self, timer: TimerId, ticks: u32) -> bool {
        match self.start_timer(timer, ticks) {
            Ok(()) => true,
            Err(error) => {
                warn!(service = %self.service, %timer, %error, "Timer not started");
                false
            }
        }
    }

    /// Cancel a timer of the dispatching service. No-op if inactive.
    pub fn stop_timer(&mut self, timer: TimerId) -> bool {
        self.timers.stop(self.service, timer)
    }

    pub fn timer_remaining(&self, timer: TimerId) -> Option<u32> {
        self.timers.remaining(self.service, timer)
    }
}
