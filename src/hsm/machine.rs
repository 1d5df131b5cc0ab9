//! The generic node: runs a [`Behavior`] under the dispatch protocol.

use super::behavior::{Behavior, HsmNode};
use super::context::Context;
use crate::builder::TopologyViolation;
use crate::core::{Event, EventKind, Signal, State, StateHistory, StateTransition};
use chrono::Utc;
use tracing::{debug, error, trace, warn};

/// One level of the hierarchy.
///
/// A `Machine` owns its behavior, its current state, the child nodes
/// attached to its states, and a trace of its transitions. Dispatch:
///
/// 1. In the pseudo-initial state only `Init` is accepted: it runs
///    `on_init`, moves to the initial state and delivers `Entry` there.
/// 2. Otherwise the child attached to the current state sees the event
///    first and the event is replaced by what the child returns.
/// 3. A consumed event stops here. Anything else goes to the behavior's
///    handler for the current state.
/// 4. A requested transition runs `Exit` on the old state, resets the old
///    state's child, updates the state, then runs `Entry` on the new one.
///
/// `Entry` and `Exit` follow the same child-first rule: this level handles
/// them only if the active child passes them back unconsumed. A child that
/// is still pseudo-initial when its state is entered is started with `Init`
/// instead, and this level then handles the `Entry`. The node that
/// synthesized an `Entry` or `Exit` discards whatever comes back, so neither
/// bubbles past it.
pub struct Machine<B, A, E>
where
    B: Behavior<A, E>,
    A: Signal,
{
    behavior: B,
    current: B::State,
    children: Vec<(B::State, Box<dyn HsmNode<A, E>>)>,
    history: StateHistory<B::State>,
}

impl<B, A, E> Machine<B, A, E>
where
    B: Behavior<A, E>,
    A: Signal,
{
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            current: B::State::pseudo_initial(),
            children: Vec::new(),
            history: StateHistory::new(),
        }
    }

    /// Attach `child` as the sub-machine active while in `state`.
    pub fn with_child<N>(mut self, state: B::State, child: N) -> Self
    where
        N: HsmNode<A, E> + 'static,
    {
        self.children.push((state, Box::new(child)));
        self
    }

    pub fn current_state(&self) -> &B::State {
        &self.current
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn history(&self) -> &StateHistory<B::State> {
        &self.history
    }

    /// Child attached to `state`, if any.
    pub fn child(&self, state: &B::State) -> Option<&dyn HsmNode<A, E>> {
        self.children
            .iter()
            .find(|(owner, _)| owner == state)
            .map(|(_, node)| node.as_ref())
    }

    fn active_child(&mut self) -> Option<&mut (dyn HsmNode<A, E> + 'static)> {
        let current = &self.current;
        self.children
            .iter_mut()
            .find(|(owner, _)| owner == current)
            .map(|(_, node)| node.as_mut())
    }

    fn reset_child_of(&mut self, state: &B::State) {
        for (owner, node) in self.children.iter_mut() {
            if owner == state {
                node.reset();
            }
        }
    }

    fn initialize(&mut self, ctx: &mut Context<'_, A, E>) {
        self.behavior.on_init(ctx);
        let initial = self.behavior.initial_state();
        if initial.is_pseudo_initial() {
            error!(
                node = self.behavior.name(),
                "Initial state is the pseudo-initial state"
            );
            if cfg!(debug_assertions) {
                panic!("initial state of {} is pseudo-initial", self.behavior.name());
            }
            return;
        }
        self.commit(initial, ctx.tick());
        self.run(Event::entry(), ctx);
    }

    fn transition_to(&mut self, next: B::State, ctx: &mut Context<'_, A, E>) {
        if next == self.current {
            trace!(
                node = self.behavior.name(),
                state = next.name(),
                "Self-transition ignored"
            );
            return;
        }
        if next.is_pseudo_initial() {
            error!(
                node = self.behavior.name(),
                from = self.current.name(),
                "Transition to the pseudo-initial state rejected"
            );
            if cfg!(debug_assertions) {
                panic!("transition to pseudo-initial in {}", self.behavior.name());
            }
            return;
        }

        self.run(Event::exit(), ctx);
        let old = self.current.clone();
        self.reset_child_of(&old);
        self.commit(next, ctx.tick());
        self.run(Event::entry(), ctx);
    }

    /// `Entry`/`Exit` delivery. Transitions requested on the way are dropped.
    fn run_pseudo(&mut self, event: Event<A>, ctx: &mut Context<'_, A, E>) -> Event<A> {
        let entering = event.kind == EventKind::Entry;
        let event = match self.active_child() {
            Some(child) if entering && !child.is_initialized() => {
                child.run(Event::init(), ctx);
                event
            }
            Some(child) => child.run(event, ctx),
            None => event,
        };
        if event.is_consumed() {
            return event;
        }

        let state = self.current.clone();
        let handled = self.behavior.handle(&state, event, ctx);
        if let Some(next) = handled.next {
            warn!(
                node = self.behavior.name(),
                state = state.name(),
                event = event.name(),
                to = next.name(),
                "Transition requested from Entry/Exit ignored"
            );
        }
        handled.event
    }

    fn commit(&mut self, next: B::State, tick: u64) {
        let from = std::mem::replace(&mut self.current, next);
        debug!(
            node = self.behavior.name(),
            from = from.name(),
            to = self.current.name(),
            tick,
            "Transition"
        );
        self.history = self.history.record(StateTransition {
            from,
            to: self.current.clone(),
            tick,
            timestamp: Utc::now(),
        });
    }
}

impl<B, A, E> HsmNode<A, E> for Machine<B, A, E>
where
    B: Behavior<A, E>,
    A: Signal,
{
    fn run(&mut self, event: Event<A>, ctx: &mut Context<'_, A, E>) -> Event<A> {
        if self.current.is_pseudo_initial() {
            if event.kind == EventKind::Init {
                self.initialize(ctx);
                return Event::none();
            }
            trace!(
                node = self.behavior.name(),
                event = event.name(),
                "Event before Init ignored"
            );
            return event;
        }

        if matches!(event.kind, EventKind::Entry | EventKind::Exit) {
            return self.run_pseudo(event, ctx);
        }

        let event = match self.active_child() {
            Some(child) => child.run(event, ctx),
            None => event,
        };
        if event.is_consumed() {
            return event;
        }

        let state = self.current.clone();
        let handled = self.behavior.handle(&state, event, ctx);

        if handled.event == event {
            trace!(
                node = self.behavior.name(),
                state = state.name(),
                event = event.name(),
                "Event bubbles up"
            );
        }

        if let Some(next) = handled.next {
            self.transition_to(next, ctx);
        }
        handled.event
    }

    fn reset(&mut self) {
        for (_, node) in self.children.iter_mut() {
            node.reset();
        }
        self.behavior.on_reset();
        self.current = B::State::pseudo_initial();
    }

    fn name(&self) -> &str {
        self.behavior.name()
    }

    fn state_name(&self) -> &str {
        self.current.name()
    }

    fn is_initialized(&self) -> bool {
        !self.current.is_pseudo_initial()
    }

    fn active_states(&self) -> Vec<&str> {
        let mut states = vec![self.current.name()];
        if let Some(child) = self.child(&self.current) {
            if child.is_initialized() {
                states.extend(child.active_states());
            }
        }
        states
    }

    fn transition_count(&self) -> usize {
        self.history.len()
    }

    fn violations(&self) -> Vec<TopologyViolation> {
        let node = self.behavior.name();
        let mut violations = Vec::new();
        if self.behavior.initial_state().is_pseudo_initial() {
            violations.push(TopologyViolation::PseudoInitialTarget {
                node: node.to_string(),
            });
        }
        for (index, (state, child)) in self.children.iter().enumerate() {
            if state.is_pseudo_initial() {
                violations.push(TopologyViolation::ChildOnPseudoInitial {
                    node: node.to_string(),
                    state: state.name().to_string(),
                });
            }
            let first = self
                .children
                .iter()
                .position(|(owner, _)| owner == state);
            if first.is_some_and(|first| first < index) {
                violations.push(TopologyViolation::DuplicateChild {
                    node: node.to_string(),
                    state: state.name().to_string(),
                });
            }
            violations.extend(child.violations());
        }
        violations
    }

    fn history_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ServiceId, TimerId};
    use crate::hsm::Handled;
    use crate::scheduler::{Mailboxes, TimerService};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum TestSignal {
        Go,
        Stop,
        Unknown,
    }

    impl Signal for TestSignal {
        fn name(&self) -> &'static str {
            match self {
                Self::Go => "Go",
                Self::Stop => "Stop",
                Self::Unknown => "Unknown",
            }
        }
    }

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        InitPState,
        Idle,
        Moving,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::InitPState => "InitPState",
                Self::Idle => "Idle",
                Self::Moving => "Moving",
            }
        }

        fn pseudo_initial() -> Self {
            Self::InitPState
        }
    }

    type Log = Vec<String>;

    struct Motor {
        name: &'static str,
        resets: usize,
    }

    impl Motor {
        fn new(name: &'static str) -> Self {
            Self { name, resets: 0 }
        }
    }

    impl Behavior<TestSignal, Log> for Motor {
        type State = TestState;

        fn name(&self) -> &str {
            self.name
        }

        fn initial_state(&self) -> TestState {
            TestState::Idle
        }

        fn on_init(&mut self, ctx: &mut Context<'_, TestSignal, Log>) {
            let name = self.name;
            ctx.env().push(format!("{name}:init"));
        }

        fn on_reset(&mut self) {
            self.resets += 1;
        }

        fn handle(
            &mut self,
            state: &TestState,
            event: Event<TestSignal>,
            ctx: &mut Context<'_, TestSignal, Log>,
        ) -> Handled<TestState, TestSignal> {
            let name = self.name;
            match (state, event.kind) {
                (_, EventKind::Entry) => {
                    ctx.env().push(format!("{name}:{}:entry", state.name()));
                    Handled::consumed()
                }
                (_, EventKind::Exit) => {
                    ctx.env().push(format!("{name}:{}:exit", state.name()));
                    Handled::consumed()
                }
                (TestState::Idle, EventKind::Signal(TestSignal::Go)) => {
                    Handled::transition(TestState::Moving)
                }
                (TestState::Moving, EventKind::Signal(TestSignal::Stop)) => {
                    Handled::transition(TestState::Idle)
                }
                (TestState::Moving, EventKind::Signal(TestSignal::Go)) => {
                    Handled::transition(TestState::Moving)
                }
                _ => Handled::ignored(event),
            }
        }
    }

    struct Fixture {
        log: Log,
        mailboxes: Mailboxes<TestSignal>,
        timers: TimerService,
    }

    impl Fixture {
        fn new() -> Self {
            let mut mailboxes = Mailboxes::new();
            mailboxes.register(ServiceId(0), 8);
            let mut timers = TimerService::new(4);
            timers.register(ServiceId(0));
            Self {
                log: Vec::new(),
                mailboxes,
                timers,
            }
        }

        fn run<N: HsmNode<TestSignal, Log>>(
            &mut self,
            node: &mut N,
            event: Event<TestSignal>,
        ) -> Event<TestSignal> {
            let mut ctx = Context::new(
                &mut self.log,
                &mut self.mailboxes,
                &mut self.timers,
                ServiceId(0),
                0,
            );
            node.run(event, &mut ctx)
        }
    }

    #[test]
    fn init_moves_to_initial_state_and_enters_it() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));

        let result = fixture.run(&mut machine, Event::init());

        assert!(result.is_consumed());
        assert_eq!(machine.current_state(), &TestState::Idle);
        assert_eq!(fixture.log, vec!["m:init", "m:Idle:entry"]);
        assert_eq!(machine.transition_count(), 1);
    }

    #[test]
    fn events_before_init_are_returned_unchanged() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));
        let event = Event::signal(TestSignal::Go, 0);

        assert_eq!(fixture.run(&mut machine, event), event);
        assert!(!machine.is_initialized());
        assert!(fixture.log.is_empty());
    }

    #[test]
    fn transition_runs_exit_then_entry() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));
        fixture.run(&mut machine, Event::init());
        fixture.log.clear();

        let result = fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));

        assert!(result.is_consumed());
        assert_eq!(machine.current_state(), &TestState::Moving);
        assert_eq!(fixture.log, vec!["m:Idle:exit", "m:Moving:entry"]);
    }

    #[test]
    fn unrecognized_event_bubbles_unchanged() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));
        fixture.run(&mut machine, Event::init());
        fixture.log.clear();

        let event = Event::signal(TestSignal::Unknown, 4);
        let result = fixture.run(&mut machine, event);

        assert_eq!(result, event);
        assert_eq!(machine.current_state(), &TestState::Idle);
        assert!(fixture.log.is_empty());
    }

    #[test]
    fn self_transition_is_not_a_transition() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));
        fixture.run(&mut machine, Event::init());
        fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));
        fixture.log.clear();
        let before = machine.transition_count();

        let result = fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));

        assert!(result.is_consumed());
        assert!(fixture.log.is_empty());
        assert_eq!(machine.transition_count(), before);
    }

    #[test]
    fn child_sees_events_first_and_is_reset_on_exit() {
        let mut fixture = Fixture::new();
        let mut machine =
            Machine::new(Motor::new("parent")).with_child(TestState::Moving, Machine::new(Motor::new("child")));
        fixture.run(&mut machine, Event::init());
        fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));

        assert_eq!(machine.active_states(), vec!["Moving", "Idle"]);
        assert_eq!(
            fixture.log,
            vec![
                "parent:init",
                "parent:Idle:entry",
                "parent:Idle:exit",
                "child:init",
                "child:Idle:entry",
                "parent:Moving:entry",
            ]
        );

        // Go is consumed by the child (Idle -> Moving); the parent never sees it.
        fixture.log.clear();
        fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));
        assert_eq!(machine.active_states(), vec!["Moving", "Moving"]);
        assert_eq!(fixture.log, vec!["child:Idle:exit", "child:Moving:entry"]);

        // Stop is consumed by the child as well.
        fixture.log.clear();
        fixture.run(&mut machine, Event::signal(TestSignal::Stop, 0));
        assert_eq!(machine.active_states(), vec!["Moving", "Idle"]);
    }

    #[test]
    fn child_consuming_exit_hides_it_from_parent() {
        struct Parent;

        impl Behavior<TestSignal, Log> for Parent {
            type State = TestState;

            fn name(&self) -> &str {
                "parent"
            }

            fn initial_state(&self) -> TestState {
                TestState::Moving
            }

            fn handle(
                &mut self,
                state: &TestState,
                event: Event<TestSignal>,
                ctx: &mut Context<'_, TestSignal, Log>,
            ) -> Handled<TestState, TestSignal> {
                match (state, event.kind) {
                    (_, EventKind::Entry) => {
                        ctx.env().push(format!("parent:{}:entry", state.name()));
                        Handled::consumed()
                    }
                    (_, EventKind::Exit) => {
                        ctx.env().push(format!("parent:{}:exit", state.name()));
                        Handled::consumed()
                    }
                    (TestState::Moving, EventKind::Signal(TestSignal::Unknown)) => {
                        Handled::transition(TestState::Idle)
                    }
                    _ => Handled::ignored(event),
                }
            }
        }

        let mut fixture = Fixture::new();
        let mut machine =
            Machine::new(Parent).with_child(TestState::Moving, Machine::new(Motor::new("child")));
        fixture.run(&mut machine, Event::init());
        fixture.log.clear();

        let result = fixture.run(&mut machine, Event::signal(TestSignal::Unknown, 0));

        assert!(result.is_consumed());
        assert_eq!(fixture.log, vec!["child:Idle:exit", "parent:Idle:entry"]);
        let child = machine.child(&TestState::Moving).unwrap();
        assert!(!child.is_initialized());
        assert_eq!(machine.active_states(), vec!["Idle"]);
    }

    #[test]
    fn reset_returns_whole_subtree_to_pseudo_initial() {
        let mut fixture = Fixture::new();
        let mut machine =
            Machine::new(Motor::new("parent")).with_child(TestState::Moving, Machine::new(Motor::new("child")));
        fixture.run(&mut machine, Event::init());
        fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));

        machine.reset();

        assert!(!machine.is_initialized());
        assert_eq!(machine.state_name(), "InitPState");
        assert!(!machine.child(&TestState::Moving).unwrap().is_initialized());
        assert_eq!(machine.behavior().resets, 1);
    }

    #[test]
    fn history_records_tick_and_path() {
        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Motor::new("m"));
        fixture.run(&mut machine, Event::init());
        fixture.run(&mut machine, Event::signal(TestSignal::Go, 0));
        fixture.run(&mut machine, Event::signal(TestSignal::Stop, 0));

        let path: Vec<_> = machine.history().get_path().into_iter().cloned().collect();
        assert_eq!(
            path,
            vec![
                TestState::InitPState,
                TestState::Idle,
                TestState::Moving,
                TestState::Idle
            ]
        );
        let json = machine.history_json().unwrap();
        assert_eq!(json["transitions"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn violations_report_bad_children() {
        let machine = Machine::new(Motor::new("parent"))
            .with_child(TestState::InitPState, Machine::new(Motor::new("a")))
            .with_child(TestState::Moving, Machine::new(Motor::new("b")))
            .with_child(TestState::Moving, Machine::new(Motor::new("c")));

        let violations = machine.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&TopologyViolation::ChildOnPseudoInitial {
            node: "parent".to_string(),
            state: "InitPState".to_string(),
        }));
        assert!(violations.contains(&TopologyViolation::DuplicateChild {
            node: "parent".to_string(),
            state: "Moving".to_string(),
        }));
    }

    #[test]
    fn handlers_can_start_timers_through_context() {
        struct Timed;

        impl Behavior<TestSignal, Log> for Timed {
            type State = TestState;

            fn name(&self) -> &str {
                "timed"
            }

            fn initial_state(&self) -> TestState {
                TestState::Idle
            }

            fn handle(
                &mut self,
                _state: &TestState,
                event: Event<TestSignal>,
                ctx: &mut Context<'_, TestSignal, Log>,
            ) -> Handled<TestState, TestSignal> {
                if event.kind == EventKind::Entry {
                    ctx.arm(TimerId(1), 5);
                }
                Handled::consumed()
            }
        }

        let mut fixture = Fixture::new();
        let mut machine = Machine::new(Timed);
        fixture.run(&mut machine, Event::init());

        assert_eq!(fixture.timers.remaining(ServiceId(0), TimerId(1)), Some(5));
    }
}
