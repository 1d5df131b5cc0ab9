//! Tower-seeking robot: an example behavior tree on top of the engine.
//!
//! The root machine searches for the beacon, drives to the tower, hands
//! control to [`AtTower`] to align, follow the wall and shoot, and falls back to
//! [`TapeEscape`] whenever the floor tape sensors fire. Behaviors are
//! generic over the hardware through [`RobotPorts`], so the same tree runs
//! against [`SimWorld`](crate::ports::sim::SimWorld) in tests and the
//! `tower-sim` binary.

mod align;
mod at_tower;
mod root;
mod shoot;
mod tape;
mod traverse;
mod wiring;

pub use align::{AlignState, TowerAlign, MAX_BUMPS};
pub use at_tower::{AtTower, AtTowerState, LEAVE_TICKS};
pub use root::{Root, RootState, BACK_OFF_TICKS, LOST_TICKS, SETUP_TICKS};
pub use shoot::{ShootState, TowerShoot, JIGGLES};
pub use tape::{TapeEscape, TapeState};
pub use traverse::{TowerTraverse, TraverseState, CORNER_TICKS, MAX_CORNERS};
pub use wiring::{
    build_robot, demo_script, robot_builder, robot_tree, RobotScheduler, BATTERY_THRESHOLD,
    BUMPER_SAMPLE_TICKS, ROBOT, TRACK_WIRE_BOUNDS, TRACK_WIRE_WINDOW,
};

use crate::core::TimerId;
use crate::hsm::{Context, Handled};
use crate::ports::{enforce_command, Drive, SensorBus, Solenoid};
use crate::signal_enum;

signal_enum! {
    /// Application events of the robot tree.
    pub enum RobotSignal {
        BumpersChanged,
        TapeChanged,
        BeaconChanged,
        TrackWireChanged,
        BatteryConnected,
        BatteryDisconnected,
        BotAligned,
        BallDeposited,
        DeadBotDetected,
        EscapedTape,
    }
}

/// Drive maneuvers.
pub const MANEUVER: TimerId = TimerId(0);
/// Pauses and the solenoid delay.
pub const WAIT: TimerId = TimerId(1);
/// Give-up timer while at a tower.
pub const LOST: TimerId = TimerId(2);

/// Tape sensor bits.
pub mod tape_mask {
    pub const FRONT_LEFT: u16 = 0x01;
    pub const FRONT_RIGHT: u16 = 0x02;
    pub const FRONT_CENTER: u16 = 0x04;
    pub const BACK_LEFT: u16 = 0x08;
    pub const BACK_RIGHT: u16 = 0x10;
    pub const SIDE_BACK: u16 = 0x20;
    pub const SIDE_FRONT: u16 = 0x40;

    pub const FRONT: u16 = FRONT_LEFT | FRONT_RIGHT;
    pub const BACK: u16 = BACK_LEFT | BACK_RIGHT;
    /// Sensors facing the floor; the side pair looks at the tower base.
    pub const ALL_FLOOR: u16 = FRONT | FRONT_CENTER | BACK;
}

/// Bumper switch bits.
pub mod bumper_mask {
    pub const FRONT_LEFT: u16 = 0x01;
    pub const FRONT_RIGHT: u16 = 0x02;
    pub const BACK_LEFT: u16 = 0x04;
    pub const BACK_RIGHT: u16 = 0x08;
    pub const SIDE_BACK: u16 = 0x10;
    pub const SIDE_FRONT: u16 = 0x20;

    pub const FRONT: u16 = FRONT_LEFT | FRONT_RIGHT;
    pub const BACK: u16 = BACK_LEFT | BACK_RIGHT;
    pub const SIDES: u16 = SIDE_BACK | SIDE_FRONT;
}

/// Beacon detector bits.
pub mod beacon_mask {
    pub const LEFT: u16 = 0x1;
    pub const FRONT: u16 = 0x2;
    pub const RIGHT: u16 = 0x4;
}

/// Everything the robot tree drives or samples.
pub trait RobotPorts: Drive + Solenoid + SensorBus + 'static {}

impl<T> RobotPorts for T where T: Drive + Solenoid + SensorBus + 'static {}

pub type RobotContext<'a, P> = Context<'a, RobotSignal, P>;

type Reply<S> = Handled<S, RobotSignal>;

/// Set both motors. Out-of-range speeds are handler bugs and surface through
/// [`enforce_command`].
fn drive<P: RobotPorts>(ctx: &mut RobotContext<'_, P>, left: i16, right: i16) {
    enforce_command(ctx.env().set_speeds(left, right));
}
