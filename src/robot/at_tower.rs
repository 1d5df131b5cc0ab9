//! Composite state active while the robot is in contact with a tower.

use super::{drive, RobotContext, RobotPorts, RobotSignal, Reply, MANEUVER};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::state_enum;

state_enum! {
    pub enum AtTowerState {
        InitPState,
        Align,
        Traverse,
        Shoot,
        Leaving,
    }
    pseudo_initial: InitPState
}

/// Drive-away time after a ball is deposited.
pub const LEAVE_TICKS: u32 = 300;

/// Align against the tower, follow its wall to the track wire, shoot, then
/// leave.
///
/// The wire reading that ends the traverse is posted again so the shooter
/// can react to it once it is running.
///
/// `BallDeposited` from [`TowerShoot`](super::TowerShoot) is consumed here
/// while shooting and posted again once the robot has cleared the tower, so
/// the root only sees it when it is safe to start scanning.
#[derive(Debug, Default)]
pub struct AtTower;

impl<P: RobotPorts> Behavior<RobotSignal, P> for AtTower {
    type State = AtTowerState;

    fn name(&self) -> &str {
        "AtTower"
    }

    fn initial_state(&self) -> AtTowerState {
        AtTowerState::Align
    }

    fn handle(
        &mut self,
        state: &AtTowerState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<AtTowerState> {
        match (state, event.kind) {
            (AtTowerState::Align, EventKind::Signal(RobotSignal::BotAligned)) => {
                Handled::transition(AtTowerState::Traverse)
            }
            (AtTowerState::Traverse, EventKind::Signal(RobotSignal::TrackWireChanged))
                if event.param != 0 =>
            {
                ctx.emit(event);
                Handled::transition(AtTowerState::Shoot)
            }
            (AtTowerState::Shoot, EventKind::Signal(RobotSignal::BallDeposited)) => {
                drive(ctx, 100, 100);
                ctx.arm(MANEUVER, LEAVE_TICKS);
                Handled::transition(AtTowerState::Leaving)
            }
            (AtTowerState::Leaving, EventKind::Timeout(MANEUVER)) => {
                ctx.emit(Event::signal(RobotSignal::BallDeposited, 0));
                Handled::consumed()
            }
            _ => Handled::ignored(event),
        }
    }
}
