use super::groups::{ForceGroupMask, MAX_FORCE_GROUP};
use super::term::{ForceError, ForceEvaluation, ForceTerm};
use crate::core::models::periodic::PeriodicBox;
use crate::core::models::topology::TopologyError;
use nalgebra::Point3;
use std::sync::Arc;

/// A force term together with the force group it belongs to.
#[derive(Debug, Clone)]
pub struct ForceEntry {
    term: Arc<dyn ForceTerm>,
    group: u8,
}

impl ForceEntry {
    pub fn term(&self) -> &dyn ForceTerm {
        self.term.as_ref()
    }

    pub fn group(&self) -> u8 {
        self.group
    }

    /// Evaluates this term alone into a fresh buffer.
    pub fn evaluate(
        &self,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
    ) -> Result<ForceEvaluation, ForceError> {
        let mut evaluation = ForceEvaluation::zeros(positions.len());
        let energy = self.accumulate(positions, periodic_box, &mut evaluation)?;
        evaluation.energy = energy;
        Ok(evaluation)
    }

    fn accumulate(
        &self,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        into: &mut ForceEvaluation,
    ) -> Result<f64, ForceError> {
        let energy = self
            .term
            .compute(positions, periodic_box, &mut into.forces)?;
        if !energy.is_finite() {
            return Err(ForceError::NonFiniteEnergy {
                force: self.term.name().to_string(),
            });
        }
        Ok(energy)
    }
}

/// Ordered collection of group-tagged force terms.
#[derive(Debug, Clone, Default)]
pub struct ForceSet {
    entries: Vec<ForceEntry>,
}

impl ForceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, term: Arc<dyn ForceTerm>, group: u8) -> Result<usize, TopologyError> {
        if group > MAX_FORCE_GROUP {
            return Err(TopologyError::InvalidForceGroup(group));
        }
        self.entries.push(ForceEntry { term, group });
        Ok(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ForceEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForceEntry> {
        self.entries.iter()
    }

    /// Entries whose group bit is set in `mask`, in insertion order.
    pub fn selected(&self, mask: ForceGroupMask) -> impl Iterator<Item = &ForceEntry> {
        self.entries.iter().filter(move |e| mask.contains(e.group))
    }

    /// Union of the groups that have at least one term.
    pub fn groups_in_use(&self) -> ForceGroupMask {
        self.entries
            .iter()
            .filter_map(|e| ForceGroupMask::single(e.group))
            .fold(ForceGroupMask::NONE, |acc, m| acc | m)
    }

    /// Validates every term against the particle count, returning the first failing index.
    pub fn validate(&self, num_particles: usize) -> Result<(), (usize, ForceError)> {
        self.entries.iter().enumerate().try_for_each(|(index, e)| {
            e.term.validate(num_particles).map_err(|err| (index, err))
        })
    }

    /// Sums energies and forces of the terms selected by `mask`.
    ///
    /// Terms outside the mask contribute exactly zero.
    pub fn evaluate(
        &self,
        positions: &[Point3<f64>],
        periodic_box: Option<&PeriodicBox>,
        mask: ForceGroupMask,
    ) -> Result<ForceEvaluation, ForceError> {
        let mut evaluation = ForceEvaluation::zeros(positions.len());
        for entry in self.selected(mask) {
            let energy = entry.accumulate(positions, periodic_box, &mut evaluation)?;
            evaluation.energy += energy;
        }
        Ok(evaluation)
    }
}
