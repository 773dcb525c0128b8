use super::potentials;
use super::term::{ForceError, ForceTerm};
use crate::core::models::periodic::PeriodicBox;
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonbondedParticle {
    /// Partial charge in e.
    pub charge: f64,
    /// Lennard-Jones σ in nm.
    pub sigma: f64,
    /// Lennard-Jones ε in kJ/mol.
    pub epsilon: f64,
}

/// All-pairs Lennard-Jones plus Coulomb interactions without a cutoff.
///
/// Mixed pairs use Lorentz–Berthelot combining rules (arithmetic σ, geometric ε). Excluded
/// pairs do not interact at all. The periodic box is ignored.
#[derive(Debug, Clone, Default)]
pub struct NonbondedForce {
    particles: Vec<NonbondedParticle>,
    exclusions: HashSet<(usize, usize)>,
}

impl NonbondedForce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds parameters for the next particle; one entry is required per system particle.
    pub fn add_particle(&mut self, charge: f64, sigma: f64, epsilon: f64) -> usize {
        self.particles.push(NonbondedParticle {
            charge,
            sigma,
            epsilon,
        });
        self.particles.len() - 1
    }

    pub fn add_exclusion(&mut self, particle1: usize, particle2: usize) {
        self.exclusions.insert(ordered_pair(particle1, particle2));
    }

    pub fn is_excluded(&self, particle1: usize, particle2: usize) -> bool {
        self.exclusions
            .contains(&ordered_pair(particle1, particle2))
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn particle_parameters(&self, index: usize) -> Option<&NonbondedParticle> {
        self.particles.get(index)
    }
}

fn ordered_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

impl ForceTerm for NonbondedForce {
    fn name(&self) -> &str {
        "NonbondedForce"
    }

    fn validate(&self, num_particles: usize) -> Result<(), ForceError> {
        if self.particles.len() != num_particles {
            return Err(ForceError::ParticleCountMismatch {
                force: self.name().to_string(),
                defined: self.particles.len(),
                count: num_particles,
            });
        }
        for &(a, b) in &self.exclusions {
            if b >= num_particles {
                return Err(ForceError::ParticleOutOfRange {
                    force: self.name().to_string(),
                    index: a.max(b),
                    count: num_particles,
                });
            }
        }
        Ok(())
    }

    fn compute(
        &self,
        positions: &[Point3<f64>],
        _periodic_box: Option<&PeriodicBox>,
        forces: &mut [Vector3<f64>],
    ) -> Result<f64, ForceError> {
        let mut energy = 0.0;
        for (i, pi) in self.particles.iter().enumerate() {
            for (j, pj) in self.particles.iter().enumerate().skip(i + 1) {
                if self.is_excluded(i, j) {
                    continue;
                }
                let delta = positions[j] - positions[i];
                let dist = delta.norm();
                if dist == 0.0 {
                    return Err(ForceError::Evaluation {
                        force: self.name().to_string(),
                        message: format!("particles {i} and {j} are coincident"),
                    });
                }

                let sigma = 0.5 * (pi.sigma + pj.sigma);
                let epsilon = (pi.epsilon * pj.epsilon).sqrt();
                let (e_lj, de_lj) = potentials::lennard_jones_12_6(dist, sigma, epsilon);
                let (e_coul, de_coul) = potentials::coulomb(dist, pi.charge, pj.charge);

                energy += e_lj + e_coul;
                let force = delta * ((de_lj + de_coul) / dist);
                forces[i] += force;
                forces[j] -= force;
            }
        }
        Ok(energy)
    }
}
