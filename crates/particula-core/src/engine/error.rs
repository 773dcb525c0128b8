use thiserror::Error;

use super::config::ConfigError;
use super::constraints::ConstraintError;
use super::utils::sampling::SamplingError;
use crate::core::forcefield::term::ForceError;
use crate::core::models::topology::TopologyError;

/// Violations of the topology invariants detected when a context is created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error(
        "Constraint {constraint} connects massless particle {massless} to particle {massive} with nonzero mass"
    )]
    MasslessConstraint {
        constraint: usize,
        massless: usize,
        massive: usize,
    },

    #[error("Force {index} ('{name}') is inconsistent with the topology: {source}")]
    InvalidForce {
        index: usize,
        name: String,
        #[source]
        source: ForceError,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid system configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Numerical instability at step {step}: {source}")]
    NumericalInstability {
        step: u64,
        #[source]
        source: ConstraintError,
    },

    #[error("Expected {expected} {quantity}, got {found}")]
    DimensionMismatch {
        quantity: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Force evaluation failed: {source}")]
    Force {
        #[from]
        source: ForceError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Velocity sampling failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Topology error: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    pub(crate) fn dimension_mismatch(quantity: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            quantity,
            expected,
            found,
        }
    }
}
