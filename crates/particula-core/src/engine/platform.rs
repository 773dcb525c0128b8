use crate::core::forcefield::groups::ForceGroupMask;
use crate::core::forcefield::set::{ForceEntry, ForceSet};
use crate::core::forcefield::term::{ForceError, ForceEvaluation};
use crate::core::models::periodic::PeriodicBox;
use nalgebra::Point3;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A compute backend for force and energy evaluation.
///
/// A platform is chosen once when a context is created and is owned by it.
pub trait Platform: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Total potential energy and per-particle forces of the terms selected by `mask`.
    fn calc_forces_and_energy(
        &self,
        forces: &ForceSet,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        mask: ForceGroupMask,
    ) -> Result<ForceEvaluation, ForceError>;
}

/// Serial evaluation, term by term, into one shared buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferencePlatform;

impl Platform for ReferencePlatform {
    fn name(&self) -> &'static str {
        "Reference"
    }

    fn calc_forces_and_energy(
        &self,
        forces: &ForceSet,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        mask: ForceGroupMask,
    ) -> Result<ForceEvaluation, ForceError> {
        forces.evaluate(positions, periodic_box, mask)
    }
}

/// Evaluates force terms concurrently, one private buffer per term.
///
/// Partial results are summed in term order, so the result does not depend on scheduling.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuPlatform;

impl Platform for CpuPlatform {
    fn name(&self) -> &'static str {
        "CPU"
    }

    fn calc_forces_and_energy(
        &self,
        forces: &ForceSet,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        mask: ForceGroupMask,
    ) -> Result<ForceEvaluation, ForceError> {
        let selected: Vec<&ForceEntry> = forces.selected(mask).collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = selected.iter();
        #[cfg(feature = "parallel")]
        let iterator = selected.par_iter();

        let partials: Vec<ForceEvaluation> = iterator
            .map(|entry| entry.evaluate(positions, periodic_box))
            .collect::<Result<Vec<_>, ForceError>>()?;

        Ok(partials
            .into_iter()
            .fold(ForceEvaluation::zeros(positions.len()), |acc, partial| {
                acc + partial
            }))
    }
}

/// Resolves a platform by its (case-insensitive) name.
pub fn platform_by_name(name: &str) -> Option<Box<dyn Platform>> {
    match name.to_ascii_lowercase().as_str() {
        "reference" => Some(Box::new(ReferencePlatform)),
        "cpu" => Some(Box::new(CpuPlatform)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::bonded::HarmonicBondForce;
    use crate::core::forcefield::external::UniformFieldForce;
    use crate::core::forcefield::nonbonded::NonbondedForce;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn mixed_force_set() -> ForceSet {
        let mut bonds = HarmonicBondForce::new();
        bonds.add_bond(0, 1, 1.0, 100.0);
        let mut nonbonded = NonbondedForce::new();
        for i in 0..3 {
            nonbonded.add_particle(if i % 2 == 0 { 0.3 } else { -0.3 }, 0.3, 0.5);
        }
        nonbonded.add_exclusion(0, 1);
        let mut field = UniformFieldForce::new(Vector3::new(0.0, 0.0, 1.5));
        field.add_particle(2);

        let mut set = ForceSet::new();
        set.push(Arc::new(bonds), 0).unwrap();
        set.push(Arc::new(nonbonded), 1).unwrap();
        set.push(Arc::new(field), 2).unwrap();
        set
    }

    fn positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.1, 0.0, 0.0),
            Point3::new(0.4, 0.7, -0.2),
        ]
    }

    #[test]
    fn cpu_and_reference_platforms_agree() {
        let set = mixed_force_set();
        let positions = positions();
        for mask in [
            ForceGroupMask::ALL,
            ForceGroupMask::single(1).unwrap(),
            ForceGroupMask::from_groups([0, 2]).unwrap(),
        ] {
            let reference = ReferencePlatform
                .calc_forces_and_energy(&set, &positions, None, mask)
                .unwrap();
            let cpu = CpuPlatform
                .calc_forces_and_energy(&set, &positions, None, mask)
                .unwrap();
            assert!((reference.energy - cpu.energy).abs() < 1e-10);
            for (a, b) in reference.forces.iter().zip(&cpu.forces) {
                assert!((a - b).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn cpu_platform_with_empty_selection_returns_zeros() {
        let set = mixed_force_set();
        let eval = CpuPlatform
            .calc_forces_and_energy(&set, &positions(), None, ForceGroupMask::NONE)
            .unwrap();
        assert_eq!(eval, ForceEvaluation::zeros(3));
    }

    #[test]
    fn platform_by_name_is_case_insensitive() {
        assert_eq!(platform_by_name("Reference").unwrap().name(), "Reference");
        assert_eq!(platform_by_name("cpu").unwrap().name(), "CPU");
        assert!(platform_by_name("CUDA").is_none());
    }
}
