//! # Force Field Module
//!
//! The force abstraction consumed by the dynamics engine.
//!
//! ## Overview
//!
//! The engine never knows which interactions exist. It only needs something that, for a set
//! of positions (and optionally periodic box vectors), returns a scalar potential energy and a
//! force on every particle. That capability is the [`term::ForceTerm`] trait. Terms are
//! collected in an ordered [`set::ForceSet`], each tagged with a force group in `0..=31`, and
//! evaluated through a [`groups::ForceGroupMask`] so that integrators can include or exclude
//! whole groups (multiple-time-step schemes, selective integration).
//!
//! ## Key Components
//!
//! - [`term`] - The `ForceTerm` trait, `ForceEvaluation` and `ForceError`
//! - [`groups`] - Force-group bitmasks
//! - [`set`] - Ordered, group-tagged force collection with masked evaluation
//! - [`potentials`] - Scalar pair potentials returning energy and radial derivative
//! - [`bonded`], [`nonbonded`], [`external`] - Reference force terms
//!
//! ## Usage
//!
//! ```ignore
//! use particula::core::forcefield::bonded::HarmonicBondForce;
//!
//! let mut bonds = HarmonicBondForce::new();
//! bonds.add_bond(0, 1, 0.15, 2.5e5);
//! topology.add_force(bonds, 0)?;
//! ```

pub mod bonded;
pub mod external;
pub mod groups;
pub mod nonbonded;
pub(crate) mod potentials;
pub mod set;
pub mod term;
