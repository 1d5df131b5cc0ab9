//! Top level of the robot tree.

use super::{beacon_mask, bumper_mask, drive, tape_mask, RobotContext, RobotPorts, RobotSignal, Reply};
use super::{LOST, MANEUVER, WAIT};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::state_enum;
use tracing::{info, warn};

state_enum! {
    pub enum RootState {
        InitPState,
        SetUp,
        SpinScan,
        TowardsTower,
        AtTower,
        TraverseScan,
        OnTape,
        Lost,
    }
    pseudo_initial: InitPState
}

/// Settle time before the first scan and between battery checks.
pub const SETUP_TICKS: u32 = 400;
/// Reverse time after hitting the tower.
pub const BACK_OFF_TICKS: u32 = 500;
/// Time allowed at one tower before giving up on it.
pub const LOST_TICKS: u32 = 10_000;

const SPIN: (i16, i16) = (80, -80);
const SPIN_BACK: (i16, i16) = (-80, 80);
const FULL_AHEAD: (i16, i16) = (100, 100);
const REVERSE: (i16, i16) = (-80, -80);
const WANDER: (i16, i16) = (100, 70);
const PEEL_OFF: (i16, i16) = (90, 100);
const VEER_RIGHT: (i16, i16) = (100, 90);

/// Root behavior: search, approach, hand over to the tower and tape sub-machines.
///
/// After a shot the robot follows the tower wall in `TraverseScan` until the
/// beacon of the next tower shows up ahead.
#[derive(Debug, Default)]
pub struct Root {
    battery: bool,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn battery_connected(&self) -> bool {
        self.battery
    }

    fn spin<P: RobotPorts>(ctx: &mut RobotContext<'_, P>, (left, right): (i16, i16)) {
        drive(ctx, left, right);
    }

    /// Back off the tower and let [`AtTower`](super::AtTower) see the bump again.
    fn hit_tower<P: RobotPorts>(
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<RootState> {
        drive(ctx, REVERSE.0, REVERSE.1);
        ctx.arm(MANEUVER, BACK_OFF_TICKS);
        ctx.emit(event);
        Handled::transition(RootState::AtTower)
    }
}

impl<P: RobotPorts> Behavior<RobotSignal, P> for Root {
    type State = RootState;

    fn name(&self) -> &str {
        "Root"
    }

    fn initial_state(&self) -> RootState {
        RootState::SetUp
    }

    fn on_init(&mut self, ctx: &mut RobotContext<'_, P>) {
        ctx.arm(MANEUVER, SETUP_TICKS);
    }

    fn on_reset(&mut self) {
        self.battery = false;
    }

    fn handle(
        &mut self,
        state: &RootState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<RootState> {
        use RobotSignal::*;

        match event.kind {
            EventKind::Signal(BatteryConnected) => {
                info!(level = event.param, "Battery connected");
                self.battery = true;
                return Handled::consumed();
            }
            EventKind::Signal(BatteryDisconnected) => {
                warn!(level = event.param, "Battery disconnected");
                self.battery = false;
                return Handled::consumed();
            }
            _ => {}
        }

        match (state, event.kind) {
            (RootState::SetUp, EventKind::Entry) => {
                drive(ctx, 0, 0);
                Handled::consumed()
            }
            (RootState::SetUp, EventKind::Timeout(MANEUVER)) => {
                if self.battery {
                    Self::spin(ctx, SPIN);
                    Handled::transition(RootState::SpinScan)
                } else {
                    ctx.arm(MANEUVER, SETUP_TICKS);
                    Handled::consumed()
                }
            }

            (RootState::SpinScan, EventKind::Signal(BeaconChanged))
                if event.has_bits(beacon_mask::FRONT) =>
            {
                drive(ctx, FULL_AHEAD.0, FULL_AHEAD.1);
                Handled::transition(RootState::TowardsTower)
            }

            (RootState::TowardsTower, EventKind::Signal(BumpersChanged)) if event.param != 0 => {
                Self::hit_tower(event, ctx)
            }
            (RootState::TowardsTower, EventKind::Signal(TapeChanged))
                if event.has_bits(tape_mask::ALL_FLOOR) =>
            {
                ctx.emit(event);
                Handled::transition(RootState::OnTape)
            }

            (RootState::AtTower, EventKind::Entry) => {
                ctx.arm(LOST, LOST_TICKS);
                Handled::consumed()
            }
            (RootState::AtTower | RootState::TraverseScan, EventKind::Signal(DeadBotDetected)) => {
                Handled::transition(RootState::Lost)
            }
            (RootState::AtTower, EventKind::Timeout(LOST)) => {
                warn!(ticks = LOST_TICKS, "Gave up on the tower");
                Handled::transition(RootState::Lost)
            }
            (RootState::AtTower, EventKind::Signal(BallDeposited)) => {
                Self::spin(ctx, PEEL_OFF);
                Handled::transition(RootState::TraverseScan)
            }
            (RootState::AtTower, EventKind::Exit) => {
                ctx.stop_timer(WAIT);
                ctx.stop_timer(LOST);
                Handled::consumed()
            }

            (RootState::TraverseScan, EventKind::Signal(BeaconChanged))
                if event.has_bits(beacon_mask::FRONT) =>
            {
                Self::spin(ctx, VEER_RIGHT);
                Handled::transition(RootState::TowardsTower)
            }

            (RootState::OnTape, EventKind::Signal(BumpersChanged)) => {
                if event.has_bits(bumper_mask::FRONT) {
                    Self::hit_tower(event, ctx)
                } else {
                    Handled::consumed()
                }
            }
            (RootState::OnTape, EventKind::Signal(EscapedTape)) => {
                if event.has_bits(tape_mask::FRONT_LEFT) {
                    Self::spin(ctx, SPIN_BACK);
                } else {
                    Self::spin(ctx, SPIN);
                }
                Handled::transition(RootState::SpinScan)
            }

            (RootState::Lost, EventKind::Entry) => {
                drive(ctx, WANDER.0, WANDER.1);
                Handled::consumed()
            }
            (RootState::Lost, EventKind::Signal(TapeChanged)) => {
                if event.has_bits(tape_mask::ALL_FLOOR) {
                    Self::spin(ctx, SPIN_BACK);
                    Handled::transition(RootState::SpinScan)
                } else {
                    Handled::consumed()
                }
            }
            (RootState::Lost, EventKind::Signal(BeaconChanged))
                if event.has_bits(beacon_mask::FRONT) =>
            {
                drive(ctx, FULL_AHEAD.0, FULL_AHEAD.1);
                Handled::transition(RootState::TowardsTower)
            }

            _ => Handled::ignored(event),
        }
    }
}
