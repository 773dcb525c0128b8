use super::potentials;
use super::term::{ForceError, ForceTerm};
use crate::core::models::periodic::PeriodicBox;
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicBond {
    pub particle1: usize,
    pub particle2: usize,
    /// Equilibrium length in nm.
    pub length: f64,
    /// Force constant in kJ/(mol·nm²).
    pub k: f64,
}

/// Harmonic bond stretching, `E = ½ k (r − r₀)²` per bond.
#[derive(Debug, Clone, Default)]
pub struct HarmonicBondForce {
    bonds: Vec<HarmonicBond>,
}

impl HarmonicBondForce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bond(&mut self, particle1: usize, particle2: usize, length: f64, k: f64) -> usize {
        self.bonds.push(HarmonicBond {
            particle1,
            particle2,
            length,
            k,
        });
        self.bonds.len() - 1
    }

    pub fn bonds(&self) -> &[HarmonicBond] {
        &self.bonds
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }
}

impl ForceTerm for HarmonicBondForce {
    fn name(&self) -> &str {
        "HarmonicBondForce"
    }

    fn validate(&self, num_particles: usize) -> Result<(), ForceError> {
        for bond in &self.bonds {
            for index in [bond.particle1, bond.particle2] {
                if index >= num_particles {
                    return Err(ForceError::ParticleOutOfRange {
                        force: self.name().to_string(),
                        index,
                        count: num_particles,
                    });
                }
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
        for bond in &self.bonds {
            let delta = positions[bond.particle2] - positions[bond.particle1];
            let dist = delta.norm();
            let (e, de_dr) = potentials::harmonic(dist, bond.length, bond.k);
            energy += e;
            // Coincident particles have no defined bond direction.
            if dist > 0.0 {
                let force = delta * (de_dr / dist);
                forces[bond.particle1] += force;
                forces[bond.particle2] -= force;
            }
        }
        Ok(energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretched_bond_pulls_particles_together() {
        let mut force = HarmonicBondForce::new();
        force.add_bond(0, 1, 1.5, 1.0);
        let positions = vec![Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mut forces = vec![Vector3::zeros(); 2];

        let energy = force.compute(&positions, None, &mut forces).unwrap();

        assert!((energy - 0.125).abs() < 1e-12);
        assert_eq!(forces[0], Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(forces[1], Vector3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn compressed_bond_pushes_particles_apart() {
        let mut force = HarmonicBondForce::new();
        force.add_bond(0, 1, 2.0, 4.0);
        let positions = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let mut forces = vec![Vector3::zeros(); 2];

        force.compute(&positions, None, &mut forces).unwrap();

        assert!(forces[0].y < 0.0);
        assert!(forces[1].y > 0.0);
        assert_eq!(forces[0] + forces[1], Vector3::zeros());
    }

    #[test]
    fn validate_rejects_unknown_particle() {
        let mut force = HarmonicBondForce::new();
        force.add_bond(0, 3, 1.0, 1.0);
        assert!(force.validate(4).is_ok());
        assert!(matches!(
            force.validate(3),
            Err(ForceError::ParticleOutOfRange { index: 3, count: 3, .. })
        ));
    }
}
