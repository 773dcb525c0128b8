//! # Core Models Module
//!
//! Data structures describing *what* is simulated: particles, the rigid distance constraints
//! between them, optional periodic box vectors, and the [`topology::Topology`] that collects
//! them together with the force terms.
//!
//! ## Key Components
//!
//! - [`particle`] - A point mass; zero mass marks a fixed anchor
//! - [`constraint`] - A holonomic distance constraint between two particles
//! - [`periodic`] - Periodic box vectors passed through to force terms
//! - [`topology`] - The ordered particle, constraint and force lists
//!
//! ## Usage
//!
//! ```ignore
//! use particula::core::models::topology::Topology;
//!
//! let mut topology = Topology::new();
//! let a = topology.add_particle(1.0)?;
//! let b = topology.add_particle(1.0)?;
//! topology.add_constraint(a, b, 0.1)?;
//! ```

pub mod constraint;
pub mod particle;
pub mod periodic;
pub mod topology;
