//! # Engine Module
//!
//! The stateful dynamics layer: binding a topology to an integrator and a compute platform,
//! advancing the simulation state in time, and enforcing distance constraints.
//!
//! ## Overview
//!
//! A [`context::Context`] owns everything that changes during a simulation. It is created from
//! a [`Topology`](crate::core::models::topology::Topology), an [`integrator::Integrator`] and a
//! [`platform::Platform`], validates the combination once, and from then on mediates every
//! mutation of the [`state::SimulationState`]. Observers receive immutable
//! [`snapshot::StateSnapshot`]s whose contents are chosen with [`snapshot::StateFlags`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Integrator and run parameters, builders and TOML loading
//! - **Integration** ([`integrator`]) - The stepping policy; velocity Verlet with RATTLE
//! - **Constraints** ([`constraints`]) - SHAKE/RATTLE relaxation over independent clusters
//! - **Platforms** ([`platform`]) - Force evaluation backends (serial reference, rayon CPU)
//! - **State** ([`state`], [`snapshot`]) - Live dynamical state and immutable projections of it
//! - **Progress Monitoring** ([`progress`]) - Callback-based step reporting
//! - **Error Handling** ([`error`]) - Engine-level error types

pub mod config;
pub mod constraints;
pub mod context;
pub mod error;
pub mod integrator;
pub mod platform;
pub mod progress;
pub mod snapshot;
pub mod state;
pub mod utils;
