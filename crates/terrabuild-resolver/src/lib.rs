//! Transitive dependency resolution: breadth-first over POMs with Maven's
//! nearest-wins rule, exclusions and inclusion-mode propagation.

pub mod conflict;
pub mod resolver;
pub mod version;
