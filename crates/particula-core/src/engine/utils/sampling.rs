use crate::core::models::particle::Particle;
use crate::core::units::thermal_energy;
use nalgebra::Vector3;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplingError {
    #[error("Invalid temperature: {0}. Temperature must be finite and non-negative")]
    InvalidTemperature(f64),
    #[error("Failed to build normal distribution for particle {particle}: {message}")]
    Distribution { particle: usize, message: String },
}

/// Draws velocities from the Maxwell–Boltzmann distribution at `temperature`.
///
/// Each Cartesian component of particle `i` is sampled from `N(0, kT / mᵢ)`. Massless
/// particles receive exactly zero velocity.
#[instrument(level = "trace", skip_all, fields(temperature = temperature, particles = particles.len()))]
pub fn maxwell_boltzmann_velocities(
    particles: &[Particle],
    temperature: f64,
    rng: &mut impl Rng,
) -> Result<Vec<Vector3<f64>>, SamplingError> {
    if !(temperature.is_finite() && temperature >= 0.0) {
        return Err(SamplingError::InvalidTemperature(temperature));
    }
    let kt = thermal_energy(temperature);

    particles
        .iter()
        .enumerate()
        .map(|(index, particle)| {
            if particle.is_massless() {
                return Ok(Vector3::zeros());
            }
            let sigma = (kt * particle.inverse_mass()).sqrt();
            let normal = Normal::new(0.0, sigma).map_err(|e| SamplingError::Distribution {
                particle: index,
                message: e.to_string(),
            })?;
            Ok(Vector3::new(
                normal.sample(rng),
                normal.sample(rng),
                normal.sample(rng),
            ))
        })
        .collect()
}

/// A deterministic generator for `Some(seed)`, otherwise one seeded from OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
