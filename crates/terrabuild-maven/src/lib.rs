//! Maven repository protocol for terrabuild: repository layout, HTTP and
//! local-directory transports, checksum verification, the shared artifact
//! cache with per-coordinate locks, and POM parsing.

pub mod auth;
pub mod cache;
pub mod checksum;
pub mod download;
pub mod fetch;
pub mod lock;
pub mod pom;
pub mod repository;
