//! Getting off the floor tape.

use super::{bumper_mask, drive, tape_mask, RobotContext, RobotPorts, RobotSignal, Reply, MANEUVER};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::state_enum;

state_enum! {
    pub enum TapeState {
        InitPState,
        SaveTape,
        BackUp,
        LeftTurn,
        RightTurn,
        Forward,
    }
    pseudo_initial: InitPState
}

const BACK_UP_TICKS: u32 = 600;
const TURN_TICKS: u32 = 350;
const FORWARD_TICKS: u32 = 800;

/// Back away from the tape, turn away from the side it was seen on, drive
/// clear and post `EscapedTape` carrying the tape mask that started it.
#[derive(Debug, Default)]
pub struct TapeEscape {
    last_tape: u16,
}

impl TapeEscape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_tape(&self) -> u16 {
        self.last_tape
    }

    fn escaped<P: RobotPorts>(&self, ctx: &mut RobotContext<'_, P>) -> Reply<TapeState> {
        ctx.emit(Event::signal(RobotSignal::EscapedTape, self.last_tape));
        Handled::consumed()
    }

    fn turn_away<P: RobotPorts>(&self, ctx: &mut RobotContext<'_, P>) -> Reply<TapeState> {
        ctx.arm(MANEUVER, TURN_TICKS);
        if self.last_tape & tape_mask::FRONT_LEFT != 0 {
            drive(ctx, 75, -75);
            Handled::transition(TapeState::RightTurn)
        } else {
            drive(ctx, -75, 75);
            Handled::transition(TapeState::LeftTurn)
        }
    }
}

impl<P: RobotPorts> Behavior<RobotSignal, P> for TapeEscape {
    type State = TapeState;

    fn name(&self) -> &str {
        "TapeEscape"
    }

    fn initial_state(&self) -> TapeState {
        TapeState::SaveTape
    }

    fn on_reset(&mut self) {
        self.last_tape = 0;
    }

    fn handle(
        &mut self,
        state: &TapeState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<TapeState> {
        let tape = event.is(RobotSignal::TapeChanged);

        match (state, event.kind) {
            (TapeState::SaveTape, _) if tape => {
                if !event.has_bits(tape_mask::ALL_FLOOR) {
                    self.escaped(ctx)
                } else if event.has_bits(tape_mask::FRONT) {
                    self.last_tape = event.param;
                    drive(ctx, -100, -100);
                    ctx.arm(MANEUVER, BACK_UP_TICKS);
                    Handled::transition(TapeState::BackUp)
                } else if event.has_bits(tape_mask::BACK) {
                    drive(ctx, 100, 100);
                    ctx.arm(MANEUVER, FORWARD_TICKS);
                    Handled::transition(TapeState::Forward)
                } else {
                    Handled::consumed()
                }
            }

            (TapeState::BackUp, EventKind::Timeout(MANEUVER)) => self.turn_away(ctx),
            (TapeState::BackUp, EventKind::Signal(RobotSignal::BumpersChanged))
                if event.has_bits(bumper_mask::BACK) =>
            {
                self.turn_away(ctx)
            }
            (TapeState::BackUp, _) if tape => {
                if event.has_bits(tape_mask::BACK) {
                    self.turn_away(ctx)
                } else {
                    Handled::consumed()
                }
            }

            (TapeState::LeftTurn | TapeState::RightTurn, EventKind::Timeout(MANEUVER)) => {
                drive(ctx, 100, 100);
                ctx.arm(MANEUVER, FORWARD_TICKS);
                Handled::transition(TapeState::Forward)
            }

            (TapeState::Forward, _) if tape && event.has_bits(tape_mask::FRONT) => {
                ctx.emit(event);
                Handled::transition(TapeState::SaveTape)
            }
            (TapeState::Forward, EventKind::Timeout(MANEUVER)) => self.escaped(ctx),

            _ => Handled::ignored(event),
        }
    }
}
