//! High-level operations behind the `terrabuild` commands.
//!
//! Each `ops_*` module implements one command on top of the core, maven,
//! resolver and package crates. [`context::ProjectContext`] loads what they
//! share.

pub mod context;
pub mod ops_build;
pub mod ops_catalog;
pub mod ops_clean;
pub mod ops_fetch;
pub mod ops_plan;
pub mod ops_run;
