//! # Core Module
//!
//! Stateless building blocks shared by the dynamics engine.
//!
//! ## Architecture
//!
//! - **Particle system description** ([`models`]) - Particles, distance constraints, periodic
//!   box vectors and the [`models::topology::Topology`] that ties them together
//! - **Force evaluation** ([`forcefield`]) - The force-term capability, force-group masks,
//!   the ordered force set and reference force terms
//! - **Physical constants** ([`units`]) - Constants in the engine's unit system
//!
//! Nothing in this module mutates a running simulation; the engine layer owns all dynamical
//! state.

pub mod forcefield;
pub mod models;
pub mod units;
