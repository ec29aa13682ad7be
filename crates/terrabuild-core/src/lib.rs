//! Core data types for the terrabuild build driver.
//!
//! This crate defines what a terrabuild project is made of: the version
//! catalog and its key paths, the placeholder syntax used to reference
//! catalog values, the `Terrabuild.toml` manifest, per-platform build
//! descriptions and the dependency declarations they produce, global
//! configuration, and `.terrabuild.env` properties.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod catalog;
pub mod config;
pub mod dependency;
pub mod key_path;
pub mod manifest;
pub mod placeholder;
pub mod platform;
pub mod properties;
pub mod template;
