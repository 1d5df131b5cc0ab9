//! Squaring the robot up against the tower wall.

use super::{bumper_mask, drive, RobotContext, RobotPorts, RobotSignal, Reply, MANEUVER, WAIT};
use crate::core::{Event, EventKind};
use crate::hsm::{Behavior, Handled};
use crate::state_enum;
use tracing::warn;

state_enum! {
    pub enum AlignState {
        InitPState,
        Adjust,
        Bump,
        Aligned,
        Right,
        Edge,
        Check,
    }
    pseudo_initial: InitPState
}

/// Entries into `Bump` after which the tower is declared a dead bot.
pub const MAX_BUMPS: u8 = 4;

const RECOIL_TICKS: u32 = 350;
const ROTATE_TICKS: u32 = 250;
const SETTLE_TICKS: u32 = 400;
const CHECK_TICKS: u32 = 200;

/// Bump into the tower until both front bumpers touch, then follow the wall
/// until the side bumpers confirm alignment and post `BotAligned`.
#[derive(Debug, Default)]
pub struct TowerAlign {
    last_bumped: u16,
    bumps: u8,
}

impl TowerAlign {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bumps(&self) -> u8 {
        self.bumps
    }
}

impl<P: RobotPorts> Behavior<RobotSignal, P> for TowerAlign {
    type State = AlignState;

    fn name(&self) -> &str {
        "TowerAlign"
    }

    fn initial_state(&self) -> AlignState {
        AlignState::Adjust
    }

    fn on_reset(&mut self) {
        self.last_bumped = 0;
        self.bumps = 0;
    }

    fn handle(
        &mut self,
        state: &AlignState,
        event: Event<RobotSignal>,
        ctx: &mut RobotContext<'_, P>,
    ) -> Reply<AlignState> {
        let bumpers = event.is(RobotSignal::BumpersChanged);

        match (state, event.kind) {
            (AlignState::Adjust, _) if bumpers => {
                self.last_bumped = event.param;
                Handled::consumed()
            }
            (AlignState::Adjust, EventKind::Timeout(MANEUVER)) => {
                let front = self.last_bumped & bumper_mask::FRONT;
                if front == bumper_mask::FRONT {
                    drive(ctx, 85, 70);
                    Handled::transition(AlignState::Aligned)
                } else if front == bumper_mask::FRONT_LEFT {
                    drive(ctx, 80, 100);
                    Handled::transition(AlignState::Bump)
                } else if front == bumper_mask::FRONT_RIGHT {
                    drive(ctx, 100, 80);
                    Handled::transition(AlignState::Bump)
                } else {
                    drive(ctx, 80, 70);
                    Handled::transition(AlignState::Bump)
                }
            }

            (AlignState::Bump, EventKind::Entry) => {
                self.bumps += 1;
                if self.bumps >= MAX_BUMPS {
                    warn!(bumps = self.bumps, "Tower never squared up");
                    ctx.emit(Event::signal(RobotSignal::DeadBotDetected, 0));
                }
                Handled::consumed()
            }
            (AlignState::Bump, _) if bumpers && event.param != 0 => {
                drive(ctx, -100, -100);
                ctx.arm(MANEUVER, RECOIL_TICKS);
                self.last_bumped = event.param;
                Handled::transition(AlignState::Adjust)
            }

            (AlignState::Aligned, _) if bumpers => {
                if event.param == bumper_mask::SIDE_FRONT {
                    drive(ctx, 0, -100);
                    Handled::transition(AlignState::Edge)
                } else if event.param != 0 {
                    drive(ctx, -60, -90);
                    ctx.arm(MANEUVER, ROTATE_TICKS);
                    Handled::transition(AlignState::Right)
                } else {
                    Handled::consumed()
                }
            }
            (AlignState::Aligned, EventKind::Timeout(WAIT)) => {
                drive(ctx, 0, 90);
                Handled::consumed()
            }

            (AlignState::Right, EventKind::Timeout(MANEUVER)) => {
                drive(ctx, 90, 60);
                ctx.arm(WAIT, SETTLE_TICKS);
                Handled::transition(AlignState::Aligned)
            }

            (AlignState::Edge, _) if bumpers && event.has_bits(bumper_mask::SIDE_BACK) => {
                drive(ctx, -60, 80);
                Handled::transition(AlignState::Check)
            }
            (AlignState::Edge, _) if bumpers && event.has_bits(bumper_mask::BACK_LEFT) => {
                drive(ctx, 20, 90);
                Handled::transition(AlignState::Check)
            }
            (AlignState::Edge, EventKind::Timeout(MANEUVER)) => {
                Handled::transition(AlignState::Check)
            }

            (AlignState::Check, _) if bumpers && event.has_bits(bumper_mask::SIDE_FRONT) => {
                drive(ctx, 0, 0);
                ctx.emit(Event::signal(RobotSignal::BotAligned, event.param));
                Handled::consumed()
            }
            (AlignState::Check, _) if bumpers && event.has_bits(bumper_mask::FRONT_LEFT) => {
                drive(ctx, 0, -90);
                ctx.arm(MANEUVER, CHECK_TICKS);
                Handled::consumed()
            }
            (AlignState::Check, EventKind::Timeout(MANEUVER)) => {
                drive(ctx, 80, 80);
                Handled::consumed()
            }

            _ => Handled::ignored(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServiceId;
    use crate::hsm::{Context, HsmNode, Machine};
    use crate::ports::sim::SimWorld;
    use crate::scheduler::{Mailboxes, TimerService};

    struct Rig {
        world: SimWorld,
        mailboxes: Mailboxes<RobotSignal>,
        timers: TimerService,
        node: Machine<TowerAlign, RobotSignal, SimWorld>,
    }

    impl Rig {
        fn started() -> Self {
            let mut mailboxes = Mailboxes::new();
            mailboxes.register(ServiceId(0), 8);
            let mut timers = TimerService::new(4);
            timers.register(ServiceId(0));
            let mut rig = Self {
                world: SimWorld::powered(),
                mailboxes,
                timers,
                node: Machine::new(TowerAlign::new()),
            };
            rig.send(Event::init());
            rig
        }

        fn send(&mut self, event: Event<RobotSignal>) -> Event<RobotSignal> {
            let mut ctx = Context::new(
                &mut self.world,
                &mut self.mailboxes,
                &mut self.timers,
                ServiceId(0),
                0,
            );
            self.node.run(event, &mut ctx)
        }

        fn bump(&mut self, mask: u16) -> Event<RobotSignal> {
            self.send(Event::signal(RobotSignal::BumpersChanged, mask))
        }
    }

    #[test]
    fn both_front_bumpers_mean_aligned() {
        let mut rig = Rig::started();
        rig.bump(bumper_mask::FRONT);
        rig.send(Event::timeout(MANEUVER));

        assert_eq!(rig.node.current_state(), &AlignState::Aligned);
        assert_eq!(rig.world.speeds(), (85, 70));
    }

    #[test]
    fn single_bumper_steers_toward_the_wall() {
        let mut rig = Rig::started();
        rig.bump(bumper_mask::FRONT_LEFT);
        rig.send(Event::timeout(MANEUVER));

        assert_eq!(rig.node.current_state(), &AlignState::Bump);
        assert_eq!(rig.world.speeds(), (80, 100));

        rig.bump(bumper_mask::FRONT_RIGHT);
        assert_eq!(rig.node.current_state(), &AlignState::Adjust);
        assert_eq!(rig.timers.remaining(ServiceId(0), MANEUVER), Some(RECOIL_TICKS));

        rig.send(Event::timeout(MANEUVER));
        assert_eq!(rig.world.speeds(), (100, 80));
    }

    #[test]
    fn fourth_bump_reports_dead_bot() {
        let mut rig = Rig::started();
        for _ in 0..MAX_BUMPS {
            rig.send(Event::timeout(MANEUVER));
            assert_eq!(rig.node.current_state(), &AlignState::Bump);
            rig.bump(bumper_mask::BACK_LEFT);
        }

        assert_eq!(rig.node.behavior().bumps(), MAX_BUMPS);
        assert_eq!(
            rig.mailboxes.pop(ServiceId(0)),
            Some(Event::signal(RobotSignal::DeadBotDetected, 0))
        );
    }

    #[test]
    fn side_contact_walks_to_check_then_aligned() {
        let mut rig = Rig::started();
        rig.bump(bumper_mask::FRONT);
        rig.send(Event::timeout(MANEUVER));

        rig.bump(bumper_mask::SIDE_FRONT);
        assert_eq!(rig.node.current_state(), &AlignState::Edge);

        rig.bump(bumper_mask::SIDE_BACK);
        assert_eq!(rig.node.current_state(), &AlignState::Check);

        assert!(rig.bump(bumper_mask::SIDES).is_consumed());
        assert_eq!(
            rig.mailboxes.pop(ServiceId(0)),
            Some(Event::signal(RobotSignal::BotAligned, bumper_mask::SIDES))
        );
    }

    #[test]
    fn reset_clears_bump_count() {
        let mut rig = Rig::started();
        rig.send(Event::timeout(MANEUVER));
        assert_eq!(rig.node.behavior().bumps(), 1);

        rig.node.reset();
        assert!(!rig.node.is_initialized());
        assert_eq!(rig.node.behavior().bumps(), 0);
    }

    #[test]
    fn unrelated_events_bubble() {
        let mut rig = Rig::started();
        let tape = Event::signal(RobotSignal::TapeChanged, 0x01);
        assert_eq!(rig.send(tape), tape);
    }
}
