use super::term::{ForceError, ForceTerm};
use crate::core::models::periodic::PeriodicBox;
use nalgebra::{Point3, Vector3};

/// A constant external force field acting on selected particles.
///
/// Each listed particle feels `field`, with potential energy `−field · x`.
#[derive(Debug, Clone)]
pub struct UniformFieldForce {
    field: Vector3<f64>,
    particles: Vec<usize>,
}

impl UniformFieldForce {
    pub fn new(field: Vector3<f64>) -> Self {
        Self {
            field,
            particles: Vec::new(),
        }
    }

    pub fn add_particle(&mut self, particle: usize) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    pub fn field(&self) -> Vector3<f64> {
        self.field
    }

    pub fn particles(&self) -> &[usize] {
        &self.particles
    }
}

impl ForceTerm for UniformFieldForce {
    fn name(&self) -> &str {
        "UniformFieldForce"
    }

    fn validate(&self, num_particles: usize) -> Result<(), ForceError> {
        match self.particles.iter().find(|&&p| p >= num_particles) {
            Some(&index) => Err(ForceError::ParticleOutOfRange {
                force: self.name().to_string(),
                index,
                count: num_particles,
            }),
            None => Ok(()),
        }
    }

    fn compute(
        &self,
        positions: &[Point3<f64>],
        _periodic_box: Option<&PeriodicBox>,
        forces: &mut [Vector3<f64>],
    ) -> Result<f64, ForceError> {
        let mut energy = 0.0;
        for &particle in &self.particles {
            energy -= self.field.dot(&positions[particle].coords);
            forces[particle] += self.field;
        }
        Ok(energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_applies_only_to_listed_particles() {
        let mut force = UniformFieldForce::new(Vector3::new(0.0, 0.0, -9.8));
        force.add_particle(1);
        let positions = vec![Point3::origin(), Point3::new(0.0, 0.0, 2.0)];
        let mut forces = vec![Vector3::zeros(); 2];

        let energy = force.compute(&positions, None, &mut forces).unwrap();

        assert!((energy - 19.6).abs() < 1e-12);
        assert_eq!(forces[0], Vector3::zeros());
        assert_eq!(forces[1], Vector3::new(0.0, 0.0, -9.8));
    }

    #[test]
    fn validate_rejects_unknown_particle() {
        let mut force = UniformFieldForce::new(Vector3::x());
        force.add_particle(0);
        force.add_particle(2);
        assert!(force.validate(3).is_ok());
        assert!(matches!(
            force.validate(2),
            Err(ForceError::ParticleOutOfRange { index: 2, .. })
        ));
    }
}
