//! Scheduler configuration.
//!
//! Loaded from JSON, every field optional:
//!
//! ```json
//! { "queue_capacity": 8, "drain": "single", "tick_budget_us": 500 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a [`SchedulerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How many queued events a service may consume per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Every event queued when dispatch begins.
    #[default]
    Snapshot,
    /// At most one event per service.
    Single,
}

/// What happens when a checker or timer event hits a full queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Log, count and continue.
    #[default]
    Drop,
    /// Abort the tick with `SchedulerError::Overflow`.
    Escalate,
}

/// Engine-wide tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum pending events per service
    pub queue_capacity: usize,
    /// Maximum simultaneously active timers across all services
    pub max_timers: usize,
    pub drain: DrainPolicy,
    pub overflow: OverflowPolicy,
    /// Wall-clock pacing used by `run_realtime`
    pub tick_period_ms: u64,
    /// Per-tick time budget; overruns are logged and counted
    pub tick_budget_us: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            max_timers: 16,
            drain: DrainPolicy::Snapshot,
            overflow: OverflowPolicy::Drop,
            tick_period_ms: 1,
            tick_budget_us: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_timers == 0 {
            return Err(ConfigError::Invalid(
                "max_timers must be at least 1".to_string(),
            ));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_period_ms must be at least 1".to_string(),
            ));
        }
        if self.tick_budget_us == Some(0) {
            return Err(ConfigError::Invalid(
                "tick_budget_us must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn tick_budget(&self) -> Option<Duration> {
        self.tick_budget_us.map(Duration::from_micros)
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_timers(mut self, max: usize) -> Self {
        self.max_timers = max;
        self
    }

    pub fn with_drain(mut self, drain: DrainPolicy) -> Self {
        self.drain = drain;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget_us = Some(budget.as_micros() as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.drain, DrainPolicy::Snapshot);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert_eq!(config.tick_budget(), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = SchedulerConfig::from_json_str(r#"{ "queue_capacity": 4 }"#).unwrap();
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.max_timers, 16);
        assert_eq!(config.tick_period(), Duration::from_millis(1));
    }

    #[test]
    fn policies_parse_from_snake_case() {
        let config = SchedulerConfig::from_json_str(
            r#"{ "drain": "single", "overflow": "escalate", "tick_budget_us": 250 }"#,
        )
        .unwrap();
        assert_eq!(config.drain, DrainPolicy::Single);
        assert_eq!(config.overflow, OverflowPolicy::Escalate);
        assert_eq!(config.tick_budget(), Some(Duration::from_micros(250)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = SchedulerConfig::from_json_str(r#"{ "queue_capacity": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let config = SchedulerConfig {
            tick_budget_us: Some(0),
            ..SchedulerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = SchedulerConfig::from_json_str("{ queue_capacity: }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SchedulerConfig::from_json_file("/nonexistent/tickstate.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = SchedulerConfig::default()
            .with_queue_capacity(2)
            .with_max_timers(3)
            .with_drain(DrainPolicy::Single)
            .with_overflow(OverflowPolicy::Escalate)
            .with_tick_budget(Duration::from_micros(100));

        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.max_timers, 3);
        assert_eq!(config.drain, DrainPolicy::Single);
        assert_eq!(config.overflow, OverflowPolicy::Escalate);
        assert_eq!(config.tick_budget_us, Some(100));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SchedulerConfig::default().with_drain(DrainPolicy::Single);
        let json = serde_json::to_string(&config).unwrap();
        let parsed = SchedulerConfig::from_json_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
