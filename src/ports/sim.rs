//! In-memory robot for tests and the simulator binary.
//!
//! `SimWorld` implements every port: sensor readings are plain fields the
//! caller sets, actuator calls are validated and appended to a command log.

use super::{ActuatorError, Drive, MotorSpeed, SensorBus, Solenoid};
use serde::{Deserialize, Serialize};

/// One accepted actuator command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Left(i16),
    Right(i16),
    Pulse,
}

/// Sensor inputs plus recorded actuator output.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimWorld {
    pub bumpers: u8,
    pub tape: u8,
    pub beacon: u8,
    pub track_wire: u16,
    pub battery: u16,
    left: MotorSpeed,
    right: MotorSpeed,
    commands: Vec<Command>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world with a charged battery and nothing in sight.
    pub fn powered() -> Self {
        Self {
            battery: 300,
            ..Self::default()
        }
    }

    /// Current `(left, right)` motor speeds.
    pub fn speeds(&self) -> (i16, i16) {
        (self.left.value(), self.right.value())
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn pulses(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| **command == Command::Pulse)
            .count()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn apply(&mut self, change: SensorChange) {
        match change {
            SensorChange::Bumpers(mask) => self.bumpers = mask,
            SensorChange::Tape(mask) => self.tape = mask,
            SensorChange::Beacon(mask) => self.beacon = mask,
            SensorChange::TrackWire(level) => self.track_wire = level,
            SensorChange::Battery(level) => self.battery = level,
        }
    }
}

impl Drive for SimWorld {
    fn set_left(&mut self, speed: i16) -> Result<(), ActuatorError> {
        self.left = MotorSpeed::new(speed)?;
        self.commands.push(Command::Left(speed));
        Ok(())
    }

    fn set_right(&mut self, speed: i16) -> Result<(), ActuatorError> {
        self.right = MotorSpeed::new(speed)?;
        self.commands.push(Command::Right(speed));
        Ok(())
    }
}

impl Solenoid for SimWorld {
    fn pulse(&mut self) {
        self.commands.push(Command::Pulse);
    }
}

impl SensorBus for SimWorld {
    fn bumpers(&self) -> u8 {
        self.bumpers
    }

    fn tape(&self) -> u8 {
        self.tape
    }

    fn beacon(&self) -> u8 {
        self.beacon
    }

    fn track_wire(&self) -> u16 {
        self.track_wire
    }

    fn battery(&self) -> u16 {
        self.battery
    }
}

/// A new value for one sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sensor", content = "value", rename_all = "snake_case")]
pub enum SensorChange {
    Bumpers(u8),
    Tape(u8),
    Beacon(u8),
    TrackWire(u16),
    Battery(u16),
}

/// Sensor changes scheduled at absolute ticks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Script {
    steps: Vec<(u64, SensorChange)>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `change` at `tick`. Steps at the same tick apply in insertion order.
    pub fn at(mut self, tick: u64, change: SensorChange) -> Self {
        let index = self.steps.partition_point(|(at, _)| *at <= tick);
        self.steps.insert(index, (tick, change));
        self
    }

    /// Apply every step scheduled for `tick`. Returns how many applied.
    pub fn apply_due(&self, tick: u64, world: &mut SimWorld) -> usize {
        let mut applied = 0;
        for (_, change) in self.steps.iter().filter(|(at, _)| *at == tick) {
            world.apply(*change);
            applied += 1;
        }
        applied
    }

    /// Tick of the last scheduled step.
    pub fn end(&self) -> Option<u64> {
        self.steps.iter().map(|(tick, _)| *tick).max()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_records_accepted_commands() {
        let mut world = SimWorld::new();
        world.set_speeds(80, -80).unwrap();

        assert_eq!(world.speeds(), (80, -80));
        assert_eq!(world.commands(), &[Command::Left(80), Command::Right(-80)]);
    }

    #[test]
    fn drive_rejects_out_of_range_without_recording() {
        let mut world = SimWorld::new();
        world.set_speeds(10, 10).unwrap();

        assert_eq!(
            world.set_left(101),
            Err(ActuatorError::SpeedOutOfRange(101))
        );
        assert_eq!(world.speeds(), (10, 10));
        assert_eq!(world.commands().len(), 2);
    }

    #[test]
    fn stop_zeroes_both_motors() {
        let mut world = SimWorld::new();
        world.set_speeds(50, 60).unwrap();
        world.stop().unwrap();
        assert_eq!(world.speeds(), (0, 0));
    }

    #[test]
    fn pulses_are_counted() {
        let mut world = SimWorld::new();
        world.pulse();
        world.set_left(5).unwrap();
        world.pulse();
        assert_eq!(world.pulses(), 2);

        world.clear_commands();
        assert_eq!(world.pulses(), 0);
    }

    #[test]
    fn sensors_read_back_applied_changes() {
        let mut world = SimWorld::powered();
        world.apply(SensorChange::Bumpers(0x03));
        world.apply(SensorChange::TrackWire(600));

        assert_eq!(world.bumpers(), 0x03);
        assert_eq!(world.track_wire(), 600);
        assert_eq!(world.battery(), 300);
    }

    #[test]
    fn script_applies_steps_at_their_tick() {
        let script = Script::new()
            .at(10, SensorChange::Beacon(0x2))
            .at(5, SensorChange::Tape(0x1))
            .at(10, SensorChange::Bumpers(0x1));
        let mut world = SimWorld::new();

        assert_eq!(script.apply_due(4, &mut world), 0);
        assert_eq!(script.apply_due(5, &mut world), 1);
        assert_eq!(world.tape, 0x1);
        assert_eq!(script.apply_due(10, &mut world), 2);
        assert_eq!((world.beacon, world.bumpers), (0x2, 0x1));
        assert_eq!(script.end(), Some(10));
        assert_eq!(script.len(), 3);
    }

    #[test]
    fn script_deserializes_from_json() {
        let json = r#"{ "steps": [[3, { "sensor": "beacon", "value": 2 }]] }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        let mut world = SimWorld::new();

        assert_eq!(script.apply_due(3, &mut world), 1);
        assert_eq!(world.beacon, 2);
    }
}
