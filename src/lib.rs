//! sparsedl-core
//!
//! This library provides sparse coding and dictionary learning via the
//! Alternating Direction Method of Multipliers (ADMM). A generic two-block
//! ADMM engine is combined with pluggable problem definitions and an
//! alternating driver that jointly optimizes a sparse coding problem and a
//! dictionary update problem.
//!
//! # Functionality
//!
//! - Validated nested solver configuration
//! - Generic ADMM engine with adaptive penalty policy and resumable solves
//! - BPDN sparse coding and constrained MOD dictionary update problems
//! - Alternating dictionary learning with combined iteration statistics
//! - Timing and logging
//!
//! # Features
//!
//! - `accelerate` - Use the `accelerate` backend for matrix operations
//! - `netlib` - Use the `netlib` backend for matrix operations
//! - `openblas` - Use the `openblas` backend for matrix operations

/// BPDN sparse coding problem
pub mod bpdn;

/// BPDN dictionary learning
pub mod bpdndl;

/// Constrained MOD dictionary update problem
pub mod cmod;

/// Validated nested configuration
pub mod config;

/// Alternating dictionary learning driver
pub mod dictlrn;

/// Generic ADMM engine
pub mod solver;

/// Iteration statistics records and display
pub mod stats;

/// Timing and logging utilities
pub mod timing;

/// Utility functions for sparse coding problems
pub mod utils;
