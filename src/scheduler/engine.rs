//! The tick loop.

use super::queue::{Mailboxes, PostError};
use super::stats::{SchedulerStats, TickReport};
use super::timer::{TimerError, TimerService};
use crate::checker::EventChecker;
use crate::config::{DrainPolicy, OverflowPolicy, SchedulerConfig};
use crate::core::{Event, ServiceId, Signal, TimerId};
use crate::hsm::{Context, HsmNode};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors returned by the scheduler's run methods.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already started")]
    AlreadyStarted,

    #[error("Scheduler not started. Call .start() before ticking")]
    NotStarted,

    #[error(transparent)]
    Post(#[from] PostError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("Queue overflow on tick {tick}: {source}")]
    Overflow { tick: u64, source: PostError },
}

struct RegisteredChecker<A: Signal, E> {
    target: ServiceId,
    checker: Box<dyn EventChecker<A, E>>,
}

/// Single-threaded, run-to-completion scheduler.
///
/// Each [`tick`](Scheduler::tick):
///
/// 1. polls every checker in registration order and queues what they report,
/// 2. advances the timers and queues a `Timeout` for each expiry,
/// 3. snapshots the queue lengths,
/// 4. for each service in ascending [`ServiceId`] order, dispatches the
///    snapshotted events (all of them, or one under [`DrainPolicy::Single`])
///    to the service's root node.
///
/// Events posted while dispatching wait for the next tick. An event a root
/// returns unconsumed is dropped.
pub struct Scheduler<A: Signal, E> {
    config: SchedulerConfig,
    roots: BTreeMap<ServiceId, Box<dyn HsmNode<A, E>>>,
    mailboxes: Mailboxes<A>,
    timers: TimerService,
    checkers: Vec<RegisteredChecker<A, E>>,
    env: E,
    tick: u64,
    started: bool,
    stats: SchedulerStats,
}

impl<A: Signal, E> Scheduler<A, E> {
    /// Assemble a scheduler from validated parts.
    pub(crate) fn from_parts(
        config: SchedulerConfig,
        services: Vec<(ServiceId, Box<dyn HsmNode<A, E>>)>,
        checkers: Vec<(ServiceId, Box<dyn EventChecker<A, E>>)>,
        env: E,
    ) -> Self {
        let mut mailboxes = Mailboxes::new();
        let mut timers = TimerService::new(config.max_timers);
        let mut roots = BTreeMap::new();
        for (service, root) in services {
            mailboxes.register(service, config.queue_capacity);
            timers.register(service);
            roots.insert(service, root);
        }
        let checkers = checkers
            .into_iter()
            .map(|(target, checker)| RegisteredChecker { target, checker })
            .collect();

        Self {
            config,
            roots,
            mailboxes,
            timers,
            checkers,
            env,
            tick: 0,
            started: false,
            stats: SchedulerStats::default(),
        }
    }

    /// Boot: place one `Init` at the head of every service's queue.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.started {
            return Err(SchedulerError::AlreadyStarted);
        }
        for service in self.roots.keys() {
            self.mailboxes.post_init(*service)?;
        }
        self.started = true;
        info!(
            services = self.roots.len(),
            checkers = self.checkers.len(),
            "Scheduler started"
        );
        Ok(())
    }

    /// Queue an application event. Never blocks; fails when the queue is full.
    pub fn post(&mut self, service: ServiceId, event: Event<A>) -> Result<(), PostError> {
        self.mailboxes.post(service, event)
    }

    /// Queue an event, dropping it if it cannot be queued.
    ///
    /// Returns whether the event was queued.
    pub fn emit(&mut self, service: ServiceId, event: Event<A>) -> bool {
        match self.post(service, event) {
            Ok(()) => true,
            Err(error) => {
                warn!(%service, %error, "Event dropped");
                self.stats.dropped += 1;
                false
            }
        }
    }

    pub fn start_timer(
        &mut self,
        service: ServiceId,
        timer: TimerId,
        ticks: u32,
    ) -> Result<(), TimerError> {
        self.timers.start(service, timer, ticks)
    }

    pub fn stop_timer(&mut self, service: ServiceId, timer: TimerId) -> bool {
        self.timers.stop(service, timer)
    }

    /// Run one poll, advance, dispatch cycle.
    pub fn tick(&mut self) -> Result<TickReport, SchedulerError> {
        if !self.started {
            return Err(SchedulerError::NotStarted);
        }
        let started_at = Instant::now();
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        self.poll_checkers(&mut report)?;
        self.advance_timers(&mut report)?;

        let snapshot: Vec<(ServiceId, usize)> = self
            .mailboxes
            .services()
            .map(|service| {
                let pending = self.mailboxes.len(service);
                let budget = match self.config.drain {
                    DrainPolicy::Snapshot => pending,
                    DrainPolicy::Single => pending.min(1),
                };
                (service, budget)
            })
            .collect();

        for (service, budget) in snapshot {
            for _ in 0..budget {
                let Some(event) = self.mailboxes.pop(service) else {
                    break;
                };
                let Some(root) = self.roots.get_mut(&service) else {
                    break;
                };
                trace!(%service, tick = self.tick, event = event.name(), "Dispatch");
                let mut ctx = Context::new(
                    &mut self.env,
                    &mut self.mailboxes,
                    &mut self.timers,
                    service,
                    self.tick,
                );
                let returned = root.run(event, &mut ctx);
                report.dispatched += 1;
                if !returned.is_consumed() {
                    report.unhandled += 1;
                    trace!(
                        %service,
                        event = returned.name(),
                        param = returned.param,
                        "Unhandled event dropped"
                    );
                }
            }
        }

        report.elapsed = started_at.elapsed();
        if let Some(budget) = self.config.tick_budget() {
            if report.elapsed > budget {
                report.overrun = true;
                warn!(
                    tick = self.tick,
                    elapsed_us = report.elapsed.as_micros() as u64,
                    budget_us = budget.as_micros() as u64,
                    "Tick exceeded its time budget"
                );
            }
        }

        self.stats.absorb(&report);
        self.tick += 1;
        Ok(report)
    }

    fn poll_checkers(&mut self, report: &mut TickReport) -> Result<(), SchedulerError> {
        let mut found = Vec::new();
        for registered in self.checkers.iter_mut() {
            if let Some(event) = registered.checker.check(&self.env) {
                debug!(
                    checker = registered.checker.name(),
                    event = event.name(),
                    param = event.param,
                    "Edge detected"
                );
                found.push((registered.target, event));
            }
        }
        for (service, event) in found {
            if self.deliver(service, event, report)? {
                report.checker_events += 1;
            }
        }
        Ok(())
    }

    fn advance_timers(&mut self, report: &mut TickReport) -> Result<(), SchedulerError> {
        for (service, timer) in self.timers.advance() {
            if self.deliver(service, Event::timeout(timer), report)? {
                report.timer_events += 1;
            }
        }
        Ok(())
    }

    /// Queue an internally produced event under the overflow policy.
    fn deliver(
        &mut self,
        service: ServiceId,
        event: Event<A>,
        report: &mut TickReport,
    ) -> Result<bool, SchedulerError> {
        match self.mailboxes.post(service, event) {
            Ok(()) => Ok(true),
            Err(source) => match self.config.overflow {
                OverflowPolicy::Drop => {
                    warn!(%service, tick = self.tick, error = %source, "Event dropped");
                    report.dropped += 1;
                    Ok(false)
                }
                OverflowPolicy::Escalate => Err(SchedulerError::Overflow {
                    tick: self.tick,
                    source,
                }),
            },
        }
    }

    /// Run `ticks` ticks.
    pub fn run_for(&mut self, ticks: u64) -> Result<&SchedulerStats, SchedulerError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(&self.stats)
    }

    /// Tick until `done` holds, checking before each tick.
    ///
    /// Returns the number of ticks run, or `None` if `max_ticks` ran out first.
    pub fn run_until<F>(&mut self, mut done: F, max_ticks: u64) -> Result<Option<u64>, SchedulerError>
    where
        F: FnMut(&Self) -> bool,
    {
        for ran in 0..max_ticks {
            if done(self) {
                return Ok(Some(ran));
            }
            self.tick()?;
        }
        Ok(done(self).then_some(max_ticks))
    }

    /// Tick at the configured period until `stop` is set.
    pub fn run_realtime(&mut self, stop: &AtomicBool) -> Result<&SchedulerStats, SchedulerError> {
        let period = self.config.tick_period();
        let mut next = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            self.tick()?;
            next += period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        info!(ticks = self.stats.ticks, "Scheduler stopped");
        Ok(&self.stats)
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Mutable access between ticks, e.g. to change simulated sensors.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn root(&self, service: ServiceId) -> Option<&dyn HsmNode<A, E>> {
        self.roots.get(&service).map(|root| root.as_ref())
    }

    pub fn services(&self) -> impl Iterator<Item = ServiceId> + '_ {
        self.roots.keys().copied()
    }

    pub fn pending(&self, service: ServiceId) -> usize {
        self.mailboxes.len(service)
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Index of the next tick to run.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
