//! # Workflows Module
//!
//! High-level procedures built on a bound [`Context`](crate::engine::context::Context).
//!
//! ## Overview
//!
//! A workflow drives a context through a complete task and packages the outcome, so callers
//! do not have to interleave stepping, snapshotting and progress reporting themselves.
//!
//! ## Architecture
//!
//! - **Run Workflow** ([`run`]) - Steps a context for a fixed number of steps and records a
//!   trajectory of snapshots at a fixed interval.

pub mod run;
