//! Shared utilities for the terrabuild build driver.
//!
//! This crate provides cross-cutting concerns used by all other terrabuild
//! crates: the error taxonomy, filesystem helpers, hashing, process spawning,
//! and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
