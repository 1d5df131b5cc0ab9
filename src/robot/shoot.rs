//! Driving along the tower to the goal and firing.

use super::{bumper_mask, drive, tape_mask, RobotContext, RobotPorts, RobotSignal, Reply, MANEUVER, WAIT};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::ports::Solenoid;
use crate::state_enum;
use tracing::debug;

state_enum! {
    pub enum ShootState {
        InitPState,
        Square,
        Position,
        Scoring,
        Halt,
        Jiggle,
    }
    pseudo_initial: InitPState
}

/// Number of back-and-forth shakes after firing.
pub const JIGGLES: u8 = 3;

const POSITION_TICKS: u32 = 300;
const APPROACH_TICKS: u32 = 500;
const FIRE_DELAY_TICKS: u32 = 800;
const HALT_TICKS: u32 = 2500;
const JIGGLE_TICKS: u32 = 150;

const BACKWARDS: (i16, i16) = (-85, -85);
const SLOW_RIGHT: (i16, i16) = (-60, -85);
const SLOW_LEFT: (i16, i16) = (-85, -60);
const FORWARD: (i16, i16) = (83, 83);

/// Follow the tower wall with the side bumpers until the side tape marks the
/// goal, stop, fire the solenoid, shake the ball loose and post
/// `BallDeposited`.
#[derive(Debug, Default)]
pub struct TowerShoot {
    jig: u8,
}

impl TowerShoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jiggles(&self) -> u8 {
        self.jig
    }

    fn halt<P: RobotPorts>(ctx: &mut RobotContext<'_, P>) -> Reply<ShootState> {
        drive(ctx, 0, 0);
        ctx.arm(WAIT, FIRE_DELAY_TICKS);
        ctx.arm(MANEUVER, HALT_TICKS);
        Handled::transition(ShootState::Halt)
    }
}

fn set<P: RobotPorts>(ctx: &mut RobotContext<'_, P>, (left, right): (i16, i16)) {
    drive(ctx, left, right);
}

impl<P: RobotPorts> Behavior<RobotSignal, P> for TowerShoot {
    type State = ShootState;

    fn name(&self) -> &str {
        "TowerShoot"
    }

    fn initial_state(&self) -> ShootState {
        ShootState::Square
    }

    fn on_reset(&mut self) {
        self.jig = 0;
    }

    fn handle(
        &mut self,
        state: &ShootState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<ShootState> {
        let bumpers = event.is(RobotSignal::BumpersChanged);
        let front = event.has_bits(bumper_mask::SIDE_FRONT);
        let back = event.has_bits(bumper_mask::SIDE_BACK);

        match (state, event.kind) {
            (ShootState::Square, EventKind::Entry) => {
                set(ctx, BACKWARDS);
                Handled::consumed()
            }
            (ShootState::Square, _) if bumpers => match (front, back) {
                (false, false) => {
                    ctx.arm(MANEUVER, POSITION_TICKS);
                    set(ctx, BACKWARDS);
                    Handled::transition(ShootState::Position)
                }
                (false, true) => {
                    set(ctx, SLOW_RIGHT);
                    Handled::consumed()
                }
                (true, false) => {
                    set(ctx, SLOW_LEFT);
                    Handled::consumed()
                }
                (true, true) => {
                    set(ctx, BACKWARDS);
                    Handled::consumed()
                }
            },

            (ShootState::Position, _) if bumpers && front => {
                set(ctx, SLOW_LEFT);
                Handled::transition(ShootState::Square)
            }
            (ShootState::Position, _) if bumpers && back => {
                set(ctx, SLOW_RIGHT);
                Handled::transition(ShootState::Square)
            }
            (ShootState::Position, EventKind::Timeout(MANEUVER)) => {
                set(ctx, FORWARD);
                ctx.arm(WAIT, APPROACH_TICKS);
                Handled::consumed()
            }
            (ShootState::Position, EventKind::Timeout(WAIT)) => {
                Handled::transition(ShootState::Scoring)
            }

            (ShootState::Scoring, _) if bumpers => {
                match (front, back) {
                    (true, true) => set(ctx, FORWARD),
                    (false, _) => drive(ctx, 75, 90),
                    (true, false) => drive(ctx, 90, 70),
                }
                Handled::consumed()
            }
            (ShootState::Scoring, EventKind::Signal(RobotSignal::TapeChanged)) => {
                let sides = event.param & (tape_mask::SIDE_FRONT | tape_mask::SIDE_BACK);
                if sides == tape_mask::SIDE_FRONT | tape_mask::SIDE_BACK {
                    Self::halt(ctx)
                } else if sides == tape_mask::SIDE_FRONT {
                    drive(ctx, 80, 80);
                    Handled::consumed()
                } else if sides == tape_mask::SIDE_BACK {
                    drive(ctx, -70, -70);
                    Handled::consumed()
                } else {
                    Handled::ignored(event)
                }
            }
            (ShootState::Scoring, EventKind::Signal(RobotSignal::TrackWireChanged))
                if event.param == 1 =>
            {
                Self::halt(ctx)
            }

            (ShootState::Halt, EventKind::Timeout(WAIT)) => {
                debug!("Firing");
                ctx.env().pulse();
                Handled::consumed()
            }
            (ShootState::Halt, EventKind::Timeout(MANEUVER)) => {
                drive(ctx, -90, -90);
                ctx.arm(MANEUVER, JIGGLE_TICKS);
                self.jig += 1;
                Handled::transition(ShootState::Jiggle)
            }

            (ShootState::Jiggle, EventKind::Timeout(MANEUVER)) => {
                if self.jig >= JIGGLES {
                    drive(ctx, 0, 0);
                    self.jig = 0;
                    ctx.emit(Event::signal(RobotSignal::BallDeposited, 0));
                } else {
                    if self.jig % 2 == 0 {
                        drive(ctx, -80, -80);
                    } else {
                        drive(ctx, 80, 80);
                    }
                    ctx.arm(MANEUVER, JIGGLE_TICKS);
                    self.jig += 1;
                }
                Handled::consumed()
            }

            _ => Handled::ignored(event),
        }
    }
}
