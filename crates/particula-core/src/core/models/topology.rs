use super::constraint::Constraint;
use super::particle::Particle;
use super::periodic::PeriodicBox;
use crate::core::forcefield::set::ForceSet;
use crate::core::forcefield::term::ForceTerm;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Particle mass must be finite and non-negative (got {0})")]
    InvalidMass(f64),
    #[error("Particle index {index} is out of range for a topology with {count} particles")]
    ParticleOutOfRange { index: usize, count: usize },
    #[error("Constraint index {index} is out of range for a topology with {count} constraints")]
    ConstraintOutOfRange { index: usize, count: usize },
    #[error("A constraint cannot connect particle {0} to itself")]
    SelfConstraint(usize),
    #[error("Constraint distance must be finite and positive (got {0})")]
    InvalidDistance(f64),
    #[error("Force group {0} is outside the valid range 0..=31")]
    InvalidForceGroup(u8),
}

/// The static description of a simulated system.
///
/// A topology is assembled before a [`Context`](crate::engine::context::Context) is created and
/// is moved into it; from then on it is only read. Particle and constraint indices are dense,
/// 0-based and stable for the lifetime of the topology.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    particles: Vec<Particle>,
    constraints: Vec<Constraint>,
    forces: ForceSet,
    default_periodic_box: Option<PeriodicBox>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a particle and returns its index.
    pub fn add_particle(&mut self, mass: f64) -> Result<usize, TopologyError> {
        validate_mass(mass)?;
        self.particles.push(Particle::new(mass));
        Ok(self.particles.len() - 1)
    }

    pub fn set_particle_mass(&mut self, index: usize, mass: f64) -> Result<(), TopologyError> {
        validate_mass(mass)?;
        let count = self.particles.len();
        let particle = self
            .particles
            .get_mut(index)
            .ok_or(TopologyError::ParticleOutOfRange { index, count })?;
        particle.mass = mass;
        Ok(())
    }

    pub fn particle_mass(&self, index: usize) -> Option<f64> {
        self.particles.get(index).map(|p| p.mass)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Adds a distance constraint between two existing particles and returns its index.
    pub fn add_constraint(
        &mut self,
        particle1: usize,
        particle2: usize,
        distance: f64,
    ) -> Result<usize, TopologyError> {
        let constraint = self.checked_constraint(particle1, particle2, distance)?;
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    pub fn set_constraint_parameters(
        &mut self,
        index: usize,
        particle1: usize,
        particle2: usize,
        distance: f64,
    ) -> Result<(), TopologyError> {
        let constraint = self.checked_constraint(particle1, particle2, distance)?;
        let count = self.constraints.len();
        let slot = self
            .constraints
            .get_mut(index)
            .ok_or(TopologyError::ConstraintOutOfRange { index, count })?;
        *slot = constraint;
        Ok(())
    }

    pub fn constraint(&self, index: usize) -> Option<&Constraint> {
        self.constraints.get(index)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Adds a force term to the given force group and returns its index in the force set.
    pub fn add_force<F>(&mut self, term: F, group: u8) -> Result<usize, TopologyError>
    where
        F: ForceTerm + 'static,
    {
        self.add_shared_force(Arc::new(term), group)
    }

    /// Adds an already shared force term, e.g. one that is also bound to another topology.
    pub fn add_shared_force(
        &mut self,
        term: Arc<dyn ForceTerm>,
        group: u8,
    ) -> Result<usize, TopologyError> {
        self.forces.push(term, group)
    }

    pub fn forces(&self) -> &ForceSet {
        &self.forces
    }

    pub fn num_forces(&self) -> usize {
        self.forces.len()
    }

    pub fn set_default_periodic_box(&mut self, periodic_box: Option<PeriodicBox>) {
        self.default_periodic_box = periodic_box;
    }

    pub fn default_periodic_box(&self) -> Option<&PeriodicBox> {
        self.default_periodic_box.as_ref()
    }

    /// Per-particle inverse masses, zero for massless particles.
    pub fn inverse_masses(&self) -> Vec<f64> {
        self.particles.iter().map(Particle::inverse_mass).collect()
    }

    fn checked_constraint(
        &self,
        particle1: usize,
        particle2: usize,
        distance: f64,
    ) -> Result<Constraint, TopologyError> {
        let count = self.particles.len();
        for index in [particle1, particle2] {
            if index >= count {
                return Err(TopologyError::ParticleOutOfRange { index, count });
            }
        }
        if particle1 == particle2 {
            return Err(TopologyError::SelfConstraint(particle1));
        }
        if !(distance.is_finite() && distance > 0.0) {
            return Err(TopologyError::InvalidDistance(distance));
        }
        Ok(Constraint::new(particle1, particle2, distance))
    }
}

fn validate_mass(mass: f64) -> Result<(), TopologyError> {
    if mass.is_finite() && mass >= 0.0 {
        Ok(())
    } else {
        Err(TopologyError::InvalidMass(mass))
    }
}
