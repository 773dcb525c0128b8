//! Utility functions for the engine module.
//!
//! Currently this holds the random sampling used to initialize velocities from a
//! thermal distribution.

pub mod sampling;
