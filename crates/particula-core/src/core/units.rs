//! Physical constants in the engine's unit system.
//!
//! Lengths are in nm, times in ps, masses in amu (g/mol), energies in kJ/mol, temperatures in
//! kelvin and charges in elementary charge units. Velocities are therefore nm/ps and forces
//! kJ/(mol·nm).

/// Molar Boltzmann constant in kJ/(mol·K).
pub const BOLTZMANN_KJ_PER_MOL_K: f64 = 0.00831446261815324;

/// Coulomb prefactor 1/(4πε₀) in kJ·nm/(mol·e²).
pub const COULOMB_CONSTANT_KJ_NM_PER_MOL_E2: f64 = 138.935456;

/// Thermal energy kT in kJ/mol at the given temperature.
#[inline]
pub fn thermal_energy(temperature: f64) -> f64 {
    BOLTZMANN_KJ_PER_MOL_K * temperature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermal_energy_at_room_temperature_is_about_2_5_kj_per_mol() {
        let kt = thermal_energy(300.0);
        assert!((kt - 2.494338785).abs() < 1e-8);
    }

    #[test]
    fn thermal_energy_at_zero_kelvin_is_zero() {
        assert_eq!(thermal_energy(0.0), 0.0);
    }
}
