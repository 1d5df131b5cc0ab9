//! Following the tower wall on the side bumpers.

use super::{bumper_mask, drive, RobotContext, RobotPorts, RobotSignal, Reply, MANEUVER, WAIT};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::state_enum;
use tracing::warn;

state_enum! {
    pub enum TraverseState {
        InitPState,
        Straight,
        Corner,
    }
    pseudo_initial: InitPState
}

/// Drive-on time past the end of a wall before turning the corner.
pub const CORNER_TICKS: u32 = 90;
/// Corners turned before the "tower" is declared a dead bot.
pub const MAX_CORNERS: u8 = 4;

const BACK_OFF_TICKS: u32 = 500;

const FORWARD: (i16, i16) = (95, 95);
const SLIGHT_LEFT: (i16, i16) = (80, 95);
const SLIGHT_RIGHT: (i16, i16) = (95, 80);

/// Keep both side bumpers on the wall; when both lose contact the wall has
/// ended, so drive on briefly and swing round the corner until the front
/// side bumper finds the next wall.
#[derive(Debug, Default)]
pub struct TowerTraverse {
    corners: u8,
}

impl TowerTraverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corners(&self) -> u8 {
        self.corners
    }
}

fn set<P: RobotPorts>(ctx: &mut RobotContext<'_, P>, (left, right): (i16, i16)) {
    drive(ctx, left, right);
}

impl<P: RobotPorts> Behavior<RobotSignal, P> for TowerTraverse {
    type State = TraverseState;

    fn name(&self) -> &str {
        "TowerTraverse"
    }

    fn initial_state(&self) -> TraverseState {
        TraverseState::Straight
    }

    fn on_reset(&mut self) {
        self.corners = 0;
    }

    fn handle(
        &mut self,
        state: &TraverseState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<TraverseState> {
        let bumpers = event.is(RobotSignal::BumpersChanged);

        match (state, event.kind) {
            (TraverseState::Straight, _) if bumpers => {
                let front = event.has_bits(bumper_mask::SIDE_FRONT);
                let back = event.has_bits(bumper_mask::SIDE_BACK);
                match (front, back) {
                    (false, false) => {
                        ctx.arm(MANEUVER, CORNER_TICKS);
                        set(ctx, FORWARD);
                        return Handled::transition(TraverseState::Corner);
                    }
                    (false, true) => set(ctx, SLIGHT_LEFT),
                    (true, false) => set(ctx, SLIGHT_RIGHT),
                    (true, true) => set(ctx, FORWARD),
                }
                Handled::consumed()
            }
            (TraverseState::Straight, EventKind::Timeout(WAIT)) => {
                set(ctx, FORWARD);
                Handled::consumed()
            }

            (TraverseState::Corner, EventKind::Entry) => {
                self.corners += 1;
                if self.corners >= MAX_CORNERS {
                    warn!(corners = self.corners, "Circled the tower without finding the wire");
                    ctx.emit(Event::signal(RobotSignal::DeadBotDetected, 0));
                }
                Handled::consumed()
            }
            (TraverseState::Corner, _) if bumpers => {
                let front = event.param & bumper_mask::FRONT;
                if front == bumper_mask::FRONT {
                    ctx.stop_timer(MANEUVER);
                    ctx.arm(WAIT, BACK_OFF_TICKS);
                    drive(ctx, -60, -100);
                    Handled::consumed()
                } else if event.has_bits(bumper_mask::SIDE_FRONT) {
                    drive(ctx, 100, 60);
                    Handled::transition(TraverseState::Straight)
                } else if front == bumper_mask::FRONT_LEFT {
                    ctx.stop_timer(MANEUVER);
                    ctx.arm(WAIT, BACK_OFF_TICKS);
                    drive(ctx, 40, -100);
                    Handled::consumed()
                } else {
                    Handled::ignored(event)
                }
            }
            (TraverseState::Corner, EventKind::Timeout(MANEUVER)) => {
                drive(ctx, -30, 100);
                Handled::consumed()
            }
            (TraverseState::Corner, EventKind::Timeout(WAIT)) => {
                set(ctx, SLIGHT_LEFT);
                Handled::consumed()
            }

            _ => Handled::ignored(event),
        }
    }
}
