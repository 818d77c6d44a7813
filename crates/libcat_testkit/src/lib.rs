//! # libcat Testkit
//!
//! Test utilities for libcat.
//!
//! This crate provides:
//! - Fixtures: sample catalogs and populated libraries
//! - Property-based test generators using proptest
//! - Stress helpers for concurrent readers and writers
//!
//! The property, scenario and concurrency suites live under `tests/`.
//!
//! ## Usage
//!
//! ```rust
//! use libcat_testkit::prelude::*;
//!
//! let library = populated_library(10);
//! assert_eq!(library.len(), 10);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
