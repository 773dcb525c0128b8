//! Radial pair potentials.
//!
//! Every function returns `(energy, dE/dr)`. The caller turns the radial derivative into a
//! pair of equal and opposite forces along the separation vector.

use crate::core::units::COULOMB_CONSTANT_KJ_NM_PER_MOL_E2;

#[inline]
pub fn harmonic(dist: f64, equilibrium: f64, force_constant: f64) -> (f64, f64) {
    let stretch = dist - equilibrium;
    (
        0.5 * force_constant * stretch * stretch,
        force_constant * stretch,
    )
}

/// `4ε[(σ/r)¹² − (σ/r)⁶]`.
#[inline]
pub fn lennard_jones_12_6(dist: f64, sigma: f64, epsilon: f64) -> (f64, f64) {
    if epsilon == 0.0 {
        return (0.0, 0.0);
    }
    let sr = sigma / dist;
    let sr6 = sr.powi(6);
    let sr12 = sr6 * sr6;
    let energy = 4.0 * epsilon * (sr12 - sr6);
    let derivative = -24.0 * epsilon * (2.0 * sr12 - sr6) / dist;
    (energy, derivative)
}

#[inline]
pub fn coulomb(dist: f64, q1: f64, q2: f64) -> (f64, f64) {
    let prefactor = COULOMB_CONSTANT_KJ_NM_PER_MOL_E2 * q1 * q2;
    let energy = prefactor / dist;
    (energy, -energy / dist)
}
