//! Event checkers: edge detectors polled once per tick.
//!
//! A checker samples the environment and reports an event only when the
//! watched condition changes. Reporting an unchanged condition twice is a
//! bug in the checker, not something the scheduler filters.

use crate::core::{Event, Signal};
use tracing::trace;

/// A polled edge detector.
///
/// The scheduler calls [`check`](EventChecker::check) once per tick, before
/// timers are advanced, and posts any returned event to the service the
/// checker was registered for.
pub trait EventChecker<A: Signal, E> {
    fn name(&self) -> &str;

    /// Sample `env`; `Some` only when the watched condition changed.
    fn check(&mut self, env: &E) -> Option<Event<A>>;
}

type Sampler<E, T> = Box<dyn Fn(&E) -> T>;
type Emitter<A, T> = Box<dyn Fn(T) -> Event<A>>;

/// Reports whenever a sampled value differs from the previous sample.
///
/// With a `period` above one the value is only sampled every `period`
/// calls, which debounces noisy digital inputs.
///
/// # Example
///
/// ```rust
/// use tickstate::checker::{EdgeChecker, EventChecker};
/// use tickstate::core::{Event, Signal};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// enum Sig { Switch }
///
/// impl Signal for Sig {
///     fn name(&self) -> &'static str { "Switch" }
/// }
///
/// let mut checker = EdgeChecker::new("switch", false, |on: &bool| *on, |on| {
///     Event::signal(Sig::Switch, on as u16)
/// });
///
/// assert_eq!(checker.check(&true), Some(Event::signal(Sig::Switch, 1)));
/// assert_eq!(checker.check(&true), None);
/// ```
pub struct EdgeChecker<A, E, T> {
    name: String,
    last: T,
    period: u32,
    countdown: u32,
    sample: Sampler<E, T>,
    emit: Emitter<A, T>,
}

impl<A, E, T> EdgeChecker<A, E, T>
where
    A: Signal,
    T: Copy + PartialEq,
{
    /// `initial` is the value assumed before the first sample.
    pub fn new(
        name: impl Into<String>,
        initial: T,
        sample: impl Fn(&E) -> T + 'static,
        emit: impl Fn(T) -> Event<A> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            last: initial,
            period: 1,
            countdown: 1,
            sample: Box::new(sample),
            emit: Box::new(emit),
        }
    }

    /// Sample only every `period` ticks. Zero is treated as one.
    pub fn every(mut self, period: u32) -> Self {
        self.period = period.max(1);
        self.countdown = self.period;
        self
    }

    pub fn last(&self) -> T {
        self.last
    }
}

impl<A, E, T> EventChecker<A, E> for EdgeChecker<A, E, T>
where
    A: Signal,
    T: Copy + PartialEq,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&mut self, env: &E) -> Option<Event<A>> {
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.period;

        let current = (self.sample)(env);
        if current == self.last {
            return None;
        }
        self.last = current;
        Some((self.emit)(current))
    }
}

/// Averages an analog input over a window and flips between low and high
/// with hysteresis.
///
/// After `window` samples the average is compared against the bounds: a
/// low detector goes high once the average exceeds `upper`, a high one goes
/// low once it drops below `lower`. Only flips are reported.
pub struct HysteresisChecker<A, E> {
    name: String,
    window: u32,
    lower: u16,
    upper: u16,
    sum: u64,
    count: u32,
    high: bool,
    sample: Sampler<E, u16>,
    emit: Emitter<A, bool>,
}

impl<A: Signal, E> HysteresisChecker<A, E> {
    pub fn new(
        name: impl Into<String>,
        bounds: (u16, u16),
        window: u32,
        sample: impl Fn(&E) -> u16 + 'static,
        emit: impl Fn(bool) -> Event<A> + 'static,
    ) -> Self {
        let (lower, upper) = bounds;
        Self {
            name: name.into(),
            window: window.max(1),
            lower: lower.min(upper),
            upper: upper.max(lower),
            sum: 0,
            count: 0,
            high: false,
            sample: Box::new(sample),
            emit: Box::new(emit),
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl<A: Signal, E> EventChecker<A, E> for HysteresisChecker<A, E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&mut self, env: &E) -> Option<Event<A>> {
        self.sum += u64::from((self.sample)(env));
        self.count += 1;
        if self.count < self.window {
            return None;
        }

        let average = self.sum / u64::from(self.window);
        self.sum = 0;
        self.count = 0;

        let flipped = if self.high {
            average < u64::from(self.lower)
        } else {
            average > u64::from(self.upper)
        };
        if !flipped {
            return None;
        }
        self.high = !self.high;
        trace!(checker = %self.name, average, high = self.high, "Threshold crossed");
        Some((self.emit)(self.high))
    }
}
