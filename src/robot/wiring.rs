//! Assembling the robot tree, its checkers and a demo timeline.

use super::{
    AtTower, AtTowerState, Root, RootState, RobotPorts, RobotSignal, TapeEscape, TowerAlign,
    TowerShoot, TowerTraverse,
};
use crate::builder::{BuildError, SchedulerBuilder};
use crate::checker::{EdgeChecker, HysteresisChecker};
use crate::config::SchedulerConfig;
use crate::core::{Event, ServiceId};
use crate::hsm::Machine;
use crate::ports::sim::{Script, SensorChange};
use crate::ports::SensorBus;
use crate::scheduler::Scheduler;

/// The robot tree runs as the only, highest-priority service.
pub const ROBOT: ServiceId = ServiceId(0);

/// Bumper switches are sampled every 50 ticks to debounce them.
pub const BUMPER_SAMPLE_TICKS: u32 = 50;
/// Battery readings above this count as connected.
pub const BATTERY_THRESHOLD: u16 = 175;
/// Track wire hysteresis band `(lower, upper)`.
pub const TRACK_WIRE_BOUNDS: (u16, u16) = (540, 580);
/// Track wire samples averaged per decision.
pub const TRACK_WIRE_WINDOW: u32 = 20;

pub type RobotScheduler<P> = Scheduler<RobotSignal, P>;

/// Root machine with its `AtTower`, `TraverseScan` and `OnTape` sub-machines
/// attached.
pub fn robot_tree<P: RobotPorts>() -> Machine<Root, RobotSignal, P> {
    let at_tower = Machine::<_, RobotSignal, P>::new(AtTower)
        .with_child(
            AtTowerState::Align,
            Machine::<_, RobotSignal, P>::new(TowerAlign::new()),
        )
        .with_child(
            AtTowerState::Traverse,
            Machine::<_, RobotSignal, P>::new(TowerTraverse::new()),
        )
        .with_child(
            AtTowerState::Shoot,
            Machine::<_, RobotSignal, P>::new(TowerShoot::new()),
        );

    Machine::new(Root::new())
        .with_child(RootState::AtTower, at_tower)
        .with_child(
            RootState::TraverseScan,
            Machine::<_, RobotSignal, P>::new(TowerTraverse::new()),
        )
        .with_child(
            RootState::OnTape,
            Machine::<_, RobotSignal, P>::new(TapeEscape::new()),
        )
}

/// Builder with the robot tree and one checker per sensor.
pub fn robot_builder<P: RobotPorts>(config: SchedulerConfig) -> SchedulerBuilder<RobotSignal, P> {
    SchedulerBuilder::new()
        .config(config)
        .service(ROBOT, robot_tree::<P>())
        .checker(
            ROBOT,
            EdgeChecker::new(
                "bumpers",
                0u8,
                |ports: &P| ports.bumpers(),
                |mask: u8| Event::signal(RobotSignal::BumpersChanged, u16::from(mask)),
            )
            .every(BUMPER_SAMPLE_TICKS),
        )
        .checker(
            ROBOT,
            EdgeChecker::new(
                "tape",
                0u8,
                |ports: &P| ports.tape(),
                |mask: u8| Event::signal(RobotSignal::TapeChanged, u16::from(mask)),
            ),
        )
        .checker(
            ROBOT,
            EdgeChecker::new(
                "beacon",
                0u8,
                |ports: &P| ports.beacon(),
                |mask: u8| Event::signal(RobotSignal::BeaconChanged, u16::from(mask)),
            ),
        )
        .checker(
            ROBOT,
            HysteresisChecker::new(
                "track_wire",
                TRACK_WIRE_BOUNDS,
                TRACK_WIRE_WINDOW,
                |ports: &P| ports.track_wire(),
                |high: bool| Event::signal(RobotSignal::TrackWireChanged, u16::from(high)),
            ),
        )
        .checker(
            ROBOT,
            EdgeChecker::new(
                "battery",
                false,
                |ports: &P| ports.battery() > BATTERY_THRESHOLD,
                |connected: bool| {
                    let signal = if connected {
                        RobotSignal::BatteryConnected
                    } else {
                        RobotSignal::BatteryDisconnected
                    };
                    Event::signal(signal, u16::from(connected))
                },
            ),
        )
}

/// Build the robot scheduler around `ports`.
pub fn build_robot<P: RobotPorts>(
    config: SchedulerConfig,
    ports: P,
) -> Result<RobotScheduler<P>, BuildError> {
    robot_builder(config).build(ports)
}

/// One full lap at 1 ms per tick: find the tower, align, follow the wall to
/// the track wire, score, leave along the wall, find the next beacon and run
/// over the floor tape on the way.
pub fn demo_script() -> Script {
    use SensorChange::*;

    Script::new()
        .at(600, Beacon(0x2))
        .at(1000, Bumpers(0x03))
        .at(1000, Beacon(0))
        .at(1600, Bumpers(0))
        .at(1700, Bumpers(0x20))
        .at(1800, Bumpers(0x30))
        .at(1900, Bumpers(0x20))
        .at(2000, Bumpers(0x30))
        .at(2100, TrackWire(700))
        .at(2200, Bumpers(0))
        .at(3100, Bumpers(0x30))
        .at(3200, Tape(0x60))
        .at(3400, Tape(0))
        .at(6300, Bumpers(0))
        .at(7000, Beacon(0x2))
        .at(7500, Tape(0x01))
        .at(7600, Tape(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsm::HsmNode;
    use crate::ports::sim::SimWorld;

    #[test]
    fn tree_has_no_topology_violations() {
        let tree = robot_tree::<SimWorld>();
        assert!(tree.violations().is_empty());
        assert_eq!(tree.name(), "Root");
        assert!(tree.child(&RootState::AtTower).is_some());
        assert!(tree.child(&RootState::TraverseScan).is_some());
        assert!(tree.child(&RootState::OnTape).is_some());
        assert!(tree.child(&RootState::Lost).is_none());
    }

    #[test]
    fn builds_with_default_config() {
        let scheduler = build_robot(SchedulerConfig::default(), SimWorld::powered()).unwrap();
        assert_eq!(scheduler.services().collect::<Vec<_>>(), vec![ROBOT]);
        assert!(!scheduler.is_started());
    }

    #[test]
    fn battery_is_reported_on_first_tick() {
        let mut scheduler = build_robot(SchedulerConfig::default(), SimWorld::powered()).unwrap();
        scheduler.start().unwrap();
        let report = scheduler.tick().unwrap();

        assert_eq!(report.checker_events, 1);
        assert_eq!(report.dispatched, 2);
        assert_eq!(scheduler.root(ROBOT).unwrap().state_name(), "SetUp");
    }

    #[test]
    fn demo_script_is_ordered() {
        let script = demo_script();
        assert_eq!(script.end(), Some(7600));
        assert_eq!(script.len(), 17);
    }
}
