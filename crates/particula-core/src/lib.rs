//! # Particula Core Library
//!
//! A particle dynamics engine: given a topology of point masses, a set of pluggable force
//! terms and a set of rigid distance constraints, it advances positions and velocities in
//! discrete time steps with a symplectic integrator while keeping every constraint satisfied
//! to a relative tolerance.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout so that data, dynamics and user-facing procedures
//! stay separate.
//!
//! - **[`core`]: The Foundation.** Passive data models (`Topology`, `Particle`, `Constraint`),
//!   the force-term capability (`ForceTerm`, `ForceSet`, `ForceGroupMask`) and a small registry
//!   of reference force terms.
//!
//! - **[`engine`]: The Dynamics Core.** The stateful layer. `Context` binds a topology to an
//!   integrator and a compute platform, owns the `SimulationState`, and hands out immutable
//!   `StateSnapshot`s. The `ConstraintSolver` implements SHAKE/RATTLE relaxation over
//!   independent constraint clusters.
//!
//! - **[`workflows`]: The Public API.** Higher-level procedures built on a `Context`, such as
//!   running a trajectory with periodic reporting.

pub mod core;
pub mod engine;
pub mod workflows;
