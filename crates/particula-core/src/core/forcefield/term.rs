use crate::core::models::periodic::PeriodicBox;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::ops::{Add, AddAssign};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForceError {
    #[error("Force '{force}' references particle {index}, but the system has {count} particles")]
    ParticleOutOfRange {
        force: String,
        index: usize,
        count: usize,
    },
    #[error("Force '{force}' defines parameters for {defined} particles, but the system has {count}")]
    ParticleCountMismatch {
        force: String,
        defined: usize,
        count: usize,
    },
    #[error("Force '{force}' produced a non-finite energy")]
    NonFiniteEnergy { force: String },
    #[error("Force '{force}' failed: {message}")]
    Evaluation { force: String, message: String },
}

/// A force contributor.
///
/// Implementations accumulate their force on every particle into `forces` (one entry per
/// particle, already sized by the caller) and return their potential energy. They must be pure
/// functions of their inputs so that the engine may evaluate different terms concurrently.
pub trait ForceTerm: fmt::Debug + Send + Sync {
    /// Short human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Checks that the term is consistent with a system of `num_particles` particles.
    fn validate(&self, num_particles: usize) -> Result<(), ForceError>;

    fn compute(
        &self,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        forces: &mut [Vector3<f64>],
    ) -> Result<f64, ForceError>;
}

/// Aggregated potential energy and per-particle forces.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceEvaluation {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
}

impl ForceEvaluation {
    pub fn zeros(num_particles: usize) -> Self {
        Self {
            energy: 0.0,
            forces: vec![Vector3::zeros(); num_particles],
        }
    }
}

impl Add for ForceEvaluation {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for ForceEvaluation {
    fn add_assign(&mut self, rhs: Self) {
        self.energy += rhs.energy;
        for (force, other) in self.forces.iter_mut().zip(rhs.forces) {
            *force += other;
        }
    }
}
