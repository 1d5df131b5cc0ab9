//! Builder for assembling a scheduler from services and checkers.

use crate::builder::error::{BuildError, TopologyViolation};
use crate::checker::EventChecker;
use crate::config::SchedulerConfig;
use crate::core::{ServiceId, Signal};
use crate::hsm::HsmNode;
use crate::scheduler::Scheduler;
use std::collections::BTreeSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

type Check = Validation<(), NonEmptyVec<TopologyViolation>>;

/// Fluent builder for a [`Scheduler`].
///
/// `build` validates the whole topology in one pass and reports every
/// problem it finds, not just the first.
///
/// # Example
///
/// ```rust
/// use tickstate::builder::SchedulerBuilder;
/// use tickstate::core::{Event, ServiceId};
/// use tickstate::hsm::{Behavior, Context, Handled, Machine};
/// use tickstate::{signal_enum, state_enum};
///
/// signal_enum! {
///     pub enum Sig { Ping }
/// }
///
/// state_enum! {
///     pub enum Idle { InitPState, Waiting }
///     pseudo_initial: InitPState
/// }
///
/// struct Listener;
///
/// impl Behavior<Sig, ()> for Listener {
///     type State = Idle;
///     fn name(&self) -> &str { "Listener" }
///     fn initial_state(&self) -> Idle { Idle::Waiting }
///     fn handle(&mut self, _: &Idle, event: Event<Sig>, _: &mut Context<'_, Sig, ()>) -> Handled<Idle, Sig> {
///         Handled::ignored(event)
///     }
/// }
///
/// let mut scheduler = SchedulerBuilder::<Sig, ()>::new()
///     .service(ServiceId(0), Machine::new(Listener))
///     .build(())
///     .unwrap();
///
/// scheduler.start().unwrap();
/// scheduler.tick().unwrap();
/// assert_eq!(scheduler.root(ServiceId(0)).unwrap().state_name(), "Waiting");
/// ```
pub struct SchedulerBuilder<A: Signal, E> {
    config: SchedulerConfig,
    services: Vec<(ServiceId, Box<dyn HsmNode<A, E>>)>,
    checkers: Vec<(ServiceId, Box<dyn EventChecker<A, E>>)>,
}

impl<A: Signal, E> SchedulerBuilder<A, E> {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            services: Vec::new(),
            checkers: Vec::new(),
        }
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register `root` as the root node of `service`.
    pub fn service<N>(mut self, service: ServiceId, root: N) -> Self
    where
        N: HsmNode<A, E> + 'static,
    {
        self.services.push((service, Box::new(root)));
        self
    }

    /// Register a checker whose events go to `target`.
    pub fn checker<C>(mut self, target: ServiceId, checker: C) -> Self
    where
        C: EventChecker<A, E> + 'static,
    {
        self.checkers.push((target, Box::new(checker)));
        self
    }

    /// Validate and assemble. `env` becomes the scheduler's environment.
    pub fn build(self, env: E) -> Result<Scheduler<A, E>, BuildError> {
        self.config.validate()?;

        if let Validation::Failure(errors) = self.validate() {
            return Err(BuildError::InvalidTopology(errors.iter().cloned().collect()));
        }

        debug!(
            services = self.services.len(),
            checkers = self.checkers.len(),
            "Scheduler built"
        );
        Ok(Scheduler::from_parts(
            self.config,
            self.services,
            self.checkers,
            env,
        ))
    }

    fn validate(&self) -> Check {
        let mut checks: Vec<Check> = Vec::new();

        checks.push(if self.services.is_empty() {
            Validation::fail(TopologyViolation::NoServices)
        } else {
            Validation::success(())
        });

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for (service, _) in &self.services {
            if !seen.insert(*service) && reported.insert(*service) {
                checks.push(Validation::fail(TopologyViolation::DuplicateService(
                    *service,
                )));
            }
        }

        for (target, checker) in &self.checkers {
            if !seen.contains(target) {
                checks.push(Validation::fail(TopologyViolation::UnknownCheckerTarget {
                    checker: checker.name().to_string(),
                    service: *target,
                }));
            }
        }

        for (_, root) in &self.services {
            for violation in root.violations() {
                checks.push(Validation::fail(violation));
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }
}

impl<A: Signal, E> Default for SchedulerBuilder<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::core::{Event, State};
    use crate::hsm::{Behavior, Context, Handled, Machine};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum TestSignal {
        Tick,
    }

    impl Signal for TestSignal {
        fn name(&self) -> &'static str {
            "Tick"
        }
    }

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        InitPState,
        Running,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::InitPState => "InitPState",
                Self::Running => "Running",
            }
        }

        fn pseudo_initial() -> Self {
            Self::InitPState
        }
    }

    struct Node;

    impl Behavior<TestSignal, ()> for Node {
        type State = TestState;

        fn name(&self) -> &str {
            "node"
        }

        fn initial_state(&self) -> TestState {
            TestState::Running
        }

        fn handle(
            &mut self,
            _state: &TestState,
            event: Event<TestSignal>,
            _ctx: &mut Context<'_, TestSignal, ()>,
        ) -> Handled<TestState, TestSignal> {
            Handled::ignored(event)
        }
    }

    struct Silent;

    impl EventChecker<TestSignal, ()> for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn check(&mut self, _env: &()) -> Option<Event<TestSignal>> {
            None
        }
    }

    #[test]
    fn builder_requires_services() {
        let result = SchedulerBuilder::<TestSignal, ()>::new().build(());

        match result {
            Err(BuildError::InvalidTopology(violations)) => {
                assert_eq!(violations, vec![TopologyViolation::NoServices]);
            }
            _ => panic!("Expected InvalidTopology"),
        }
    }

    #[test]
    fn builder_accumulates_all_violations() {
        let result = SchedulerBuilder::<TestSignal, ()>::new()
            .service(ServiceId(1), Machine::new(Node))
            .service(ServiceId(1), Machine::new(Node))
            .service(ServiceId(1), Machine::new(Node))
            .checker(ServiceId(7), Silent)
            .build(());

        let error = result.err().expect("topology should be rejected");
        let violations = error.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&TopologyViolation::DuplicateService(ServiceId(1))));
        assert!(violations.contains(&TopologyViolation::UnknownCheckerTarget {
            checker: "silent".to_string(),
            service: ServiceId(7),
        }));
    }

    #[test]
    fn builder_collects_node_violations() {
        let root = Machine::new(Node).with_child(TestState::InitPState, Machine::new(Node));
        let result = SchedulerBuilder::<TestSignal, ()>::new()
            .service(ServiceId(0), root)
            .build(());

        let error = result.err().expect("child on pseudo-initial should be rejected");
        assert_eq!(
            error.violations(),
            &[TopologyViolation::ChildOnPseudoInitial {
                node: "node".to_string(),
                state: "InitPState".to_string(),
            }]
        );
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = SchedulerBuilder::<TestSignal, ()>::new()
            .config(SchedulerConfig::default().with_queue_capacity(0))
            .service(ServiceId(0), Machine::new(Node))
            .build(());

        assert!(matches!(
            result,
            Err(BuildError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn fluent_api_builds_scheduler() {
        let scheduler = SchedulerBuilder::<TestSignal, ()>::new()
            .config(SchedulerConfig::default().with_queue_capacity(4))
            .service(ServiceId(2), Machine::new(Node))
            .service(ServiceId(0), Machine::new(Node))
            .checker(ServiceId(0), Silent)
            .build(())
            .unwrap();

        let services: Vec<_> = scheduler.services().collect();
        assert_eq!(services, vec![ServiceId(0), ServiceId(2)]);
        assert_eq!(scheduler.config().queue_capacity, 4);
        assert!(!scheduler.is_started());
    }
}
