//! Events: the only unit of communication between services and nodes.
//!
//! An [`Event`] is a small `Copy` value: a kind tag plus an integer
//! parameter. Application tags come from a [`Signal`] enum supplied by the
//! behavior tree; the engine adds the pseudo-events `Init`, `Entry`, `Exit`,
//! timer expiries, and the `NoEvent` sentinel meaning "consumed".

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Application event tags.
///
/// One `Signal` enum is shared by every node of a tree, so tags live in a
/// single namespace. Use [`signal_enum!`](crate::signal_enum) for simple enums.
pub trait Signal: Copy + Eq + Debug + Send + Sync + 'static {
    /// Tag name for display/logging.
    fn name(&self) -> &'static str;
}

/// Identifier of a registered service.
///
/// The numeric value is also the service's priority: lower values are
/// dispatched first within a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub u8);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service#{}", self.0)
    }
}

/// Identifier of a countdown timer, unique within its owning service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u8);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What an event means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind<A> {
    /// Sentinel: the event has been consumed.
    NoEvent,
    /// Drives a node out of its pseudo-initial state.
    Init,
    /// Synthesized after a node changes state.
    Entry,
    /// Synthesized before a node changes state.
    Exit,
    /// A timer owned by the receiving service reached zero.
    Timeout(TimerId),
    /// Application tag.
    Signal(A),
}

impl<A: Signal> EventKind<A> {
    /// `Init`, `Entry` and `Exit` are engine-internal and never queued by callers.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Self::Init | Self::Entry | Self::Exit)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoEvent => "NoEvent",
            Self::Init => "Init",
            Self::Entry => "Entry",
            Self::Exit => "Exit",
            Self::Timeout(_) => "Timeout",
            Self::Signal(signal) => signal.name(),
        }
    }
}

/// An immutable event value. Passed by copy through every layer of `run`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event<A> {
    pub kind: EventKind<A>,
    pub param: u16,
}

impl<A: Signal> Event<A> {
    pub const fn new(kind: EventKind<A>, param: u16) -> Self {
        Self { kind, param }
    }

    /// Application event with a parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tickstate::core::{Event, EventKind, Signal};
    ///
    /// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// enum Sig { Bumped }
    ///
    /// impl Signal for Sig {
    ///     fn name(&self) -> &'static str { "Bumped" }
    /// }
    ///
    /// let event = Event::signal(Sig::Bumped, 0x03);
    /// assert!(event.is(Sig::Bumped));
    /// assert!(event.has_bits(0x01));
    /// assert_eq!(event.kind, EventKind::Signal(Sig::Bumped));
    /// ```
    pub const fn signal(signal: A, param: u16) -> Self {
        Self::new(EventKind::Signal(signal), param)
    }

    pub const fn none() -> Self {
        Self::new(EventKind::NoEvent, 0)
    }

    pub const fn init() -> Self {
        Self::new(EventKind::Init, 0)
    }

    pub const fn entry() -> Self {
        Self::new(EventKind::Entry, 0)
    }

    pub const fn exit() -> Self {
        Self::new(EventKind::Exit, 0)
    }

    pub const fn timeout(timer: TimerId) -> Self {
        Self::new(EventKind::Timeout(timer), timer.0 as u16)
    }

    /// True once some level has consumed the event.
    pub fn is_consumed(&self) -> bool {
        self.kind == EventKind::NoEvent
    }

    /// True for the application tag `signal`.
    pub fn is(&self, signal: A) -> bool {
        self.kind == EventKind::Signal(signal)
    }

    /// True if this is the expiry of `timer`.
    pub fn is_timeout(&self, timer: TimerId) -> bool {
        self.kind == EventKind::Timeout(timer)
    }

    /// True if any bit of `mask` is set in the parameter.
    pub fn has_bits(&self, mask: u16) -> bool {
        self.param & mask != 0
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum TestSignal {
        Bumped,
        TapeSeen,
    }

    impl Signal for TestSignal {
        fn name(&self) -> &'static str {
            match self {
                Self::Bumped => "Bumped",
                Self::TapeSeen => "TapeSeen",
            }
        }
    }

    #[test]
    fn pseudo_events_are_classified() {
        assert!(EventKind::<TestSignal>::Init.is_pseudo());
        assert!(EventKind::<TestSignal>::Entry.is_pseudo());
        assert!(EventKind::<TestSignal>::Exit.is_pseudo());
        assert!(!EventKind::<TestSignal>::NoEvent.is_pseudo());
        assert!(!EventKind::<TestSignal>::Timeout(TimerId(1)).is_pseudo());
        assert!(!EventKind::Signal(TestSignal::Bumped).is_pseudo());
    }

    #[test]
    fn none_is_consumed() {
        assert!(Event::<TestSignal>::none().is_consumed());
        assert!(!Event::signal(TestSignal::Bumped, 0).is_consumed());
    }

    #[test]
    fn timeout_carries_timer_id_in_param() {
        let event = Event::<TestSignal>::timeout(TimerId(7));
        assert!(event.is_timeout(TimerId(7)));
        assert!(!event.is_timeout(TimerId(6)));
        assert_eq!(event.param, 7);
    }

    #[test]
    fn names_follow_kind() {
        assert_eq!(Event::signal(TestSignal::TapeSeen, 0).name(), "TapeSeen");
        assert_eq!(Event::<TestSignal>::entry().name(), "Entry");
        assert_eq!(Event::<TestSignal>::timeout(TimerId(0)).name(), "Timeout");
    }

    #[test]
    fn has_bits_checks_mask_overlap() {
        let event = Event::signal(TestSignal::Bumped, 0b0110);
        assert!(event.has_bits(0b0010));
        assert!(event.has_bits(0b1100));
        assert!(!event.has_bits(0b1001));
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(ServiceId(3).to_string(), "service#3");
        assert_eq!(TimerId(12).to_string(), "timer#12");
    }
}
