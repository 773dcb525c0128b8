use crate::core::models::particle::Particle;
use crate::core::models::periodic::PeriodicBox;
use nalgebra::{Point3, Vector3};

/// The live dynamical state of a bound system.
///
/// Owned by exactly one [`Context`](super::context::Context); everything outside the engine
/// sees it only through immutable [`StateSnapshot`](super::snapshot::StateSnapshot)s.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) velocities: Vec<Vector3<f64>>,
    pub(crate) time: f64,
    pub(crate) step_count: u64,
    pub(crate) periodic_box: Option<PeriodicBox>,
}

impl SimulationState {
    /// All particles at the origin and at rest, at time zero.
    pub fn new(num_particles: usize, periodic_box: Option<PeriodicBox>) -> Self {
        Self {
            positions: vec![Point3::origin(); num_particles],
            velocities: vec![Vector3::zeros(); num_particles],
            time: 0.0,
            step_count: 0,
            periodic_box,
        }
    }

    pub fn num_particles(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn periodic_box(&self) -> Option<&PeriodicBox> {
        self.periodic_box.as_ref()
    }

    /// `½ Σ m v²` in kJ/mol.
    pub fn kinetic_energy(&self, particles: &[Particle]) -> f64 {
        0.5 * particles
            .iter()
            .zip(&self.velocities)
            .map(|(p, v)| p.mass * v.norm_squared())
            .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_at_rest_at_origin() {
        let state = SimulationState::new(3, None);
        assert_eq!(state.num_particles(), 3);
        assert!(state.positions().iter().all(|p| *p == Point3::origin()));
        assert!(state.velocities().iter().all(|v| *v == Vector3::zeros()));
        assert_eq!(state.time(), 0.0);
        assert_eq!(state.step_count(), 0);
    }

    #[test]
    fn kinetic_energy_ignores_massless_particles() {
        let mut state = SimulationState::new(2, None);
        state.velocities[0] = Vector3::new(1.0, 2.0, 2.0);
        state.velocities[1] = Vector3::new(5.0, 0.0, 0.0);
        let particles = [Particle::new(2.0), Particle::new(0.0)];
        assert!((state.kinetic_energy(&particles) - 9.0).abs() < 1e-12);
    }
}
