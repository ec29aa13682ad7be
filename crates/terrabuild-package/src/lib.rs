//! Packaging of platform archives: shading bundled jars, remapping class
//! names with Tiny mappings, and writing the final archive atomically.

pub mod archive;
pub mod mappings;
pub mod remap;
pub mod shade;
