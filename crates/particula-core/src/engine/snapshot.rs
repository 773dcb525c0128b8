use crate::core::models::periodic::PeriodicBox;
use crate::core::units::BOLTZMANN_KJ_PER_MOL_K;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::ops::BitOr;

/// Selects which quantities a [`StateSnapshot`] carries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateFlags(u32);

impl StateFlags {
    pub const NONE: Self = Self(0);
    pub const POSITIONS: Self = Self(1);
    pub const VELOCITIES: Self = Self(1 << 1);
    pub const FORCES: Self = Self(1 << 2);
    /// Potential and kinetic energy.
    pub const ENERGY: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether producing these quantities requires a force evaluation.
    pub(crate) fn needs_forces(self) -> bool {
        self.contains(Self::FORCES) || self.contains(Self::ENERGY)
    }
}

impl BitOr for StateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::POSITIONS, "POSITIONS"),
            (Self::VELOCITIES, "VELOCITIES"),
            (Self::FORCES, "FORCES"),
            (Self::ENERGY, "ENERGY"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        write!(f, "StateFlags({})", names.join(" | "))
    }
}

/// An immutable copy of part of a simulation state at one instant.
///
/// Quantities that were not requested are `None`. Snapshots share nothing with the context
/// that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub(crate) time: f64,
    pub(crate) step_count: u64,
    pub(crate) periodic_box: Option<PeriodicBox>,
    pub(crate) positions: Option<Vec<Point3<f64>>>,
    pub(crate) velocities: Option<Vec<Vector3<f64>>>,
    pub(crate) forces: Option<Vec<Vector3<f64>>>,
    pub(crate) potential_energy: Option<f64>,
    pub(crate) kinetic_energy: Option<f64>,
}

impl StateSnapshot {
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn periodic_box(&self) -> Option<&PeriodicBox> {
        self.periodic_box.as_ref()
    }

    pub fn positions(&self) -> Option<&[Point3<f64>]> {
        self.positions.as_deref()
    }

    pub fn velocities(&self) -> Option<&[Vector3<f64>]> {
        self.velocities.as_deref()
    }

    pub fn forces(&self) -> Option<&[Vector3<f64>]> {
        self.forces.as_deref()
    }

    pub fn potential_energy(&self) -> Option<f64> {
        self.potential_energy
    }

    pub fn kinetic_energy(&self) -> Option<f64> {
        self.kinetic_energy
    }

    pub fn total_energy(&self) -> Option<f64> {
        Some(self.potential_energy? + self.kinetic_energy?)
    }

    /// Instantaneous temperature `2 KE / (n_dof k_B)` for the given number of degrees of
    /// freedom.
    pub fn temperature(&self, degrees_of_freedom: usize) -> Option<f64> {
        if degrees_of_freedom == 0 {
            return None;
        }
        self.kinetic_energy
            .map(|ke| 2.0 * ke / (degrees_of_freedom as f64 * BOLTZMANN_KJ_PER_MOL_K))
    }
}
