/// A point mass in the simulated system.
///
/// A mass of exactly zero denotes a particle that never moves: it acts as a fixed anchor for
/// the integrator and receives no constraint corrections.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// The mass in amu. Always finite and non-negative.
    pub mass: f64,
}

impl Particle {
    pub fn new(mass: f64) -> Self {
        Self { mass }
    }

    #[inline]
    pub fn is_massless(&self) -> bool {
        self.mass == 0.0
    }

    /// Inverse mass used for kicks and constraint weighting; zero for massless particles.
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        if self.is_massless() {
            0.0
        } else {
            1.0 / self.mass
        }
    }
}
