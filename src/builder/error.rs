//! Build errors for the scheduler builder.

use crate::config::ConfigError;
use crate::core::ServiceId;
use thiserror::Error;

/// A single problem found while validating a service tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyViolation {
    #[error("No services registered. Call .service(id, root) before .build()")]
    NoServices,

    #[error("{0} registered more than once")]
    DuplicateService(ServiceId),

    #[error("Checker '{checker}' targets unregistered {service}")]
    UnknownCheckerTarget { checker: String, service: ServiceId },

    #[error("Node '{node}' attaches a child to its pseudo-initial state {state}")]
    ChildOnPseudoInitial { node: String, state: String },

    #[error("Node '{node}' attaches more than one child to state {state}")]
    DuplicateChild { node: String, state: String },

    #[error("Node '{node}' declares its pseudo-initial state as initial state")]
    PseudoInitialTarget { node: String },
}

/// Errors that can occur when building a scheduler.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid topology: {}", describe(.0))]
    InvalidTopology(Vec<TopologyViolation>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn describe(violations: &[TopologyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BuildError {
    /// Every violation, empty for configuration errors.
    pub fn violations(&self) -> &[TopologyViolation] {
        match self {
            Self::InvalidTopology(violations) => violations,
            Self::Config(_) => &[],
        }
    }
}
