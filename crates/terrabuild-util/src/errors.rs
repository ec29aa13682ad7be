use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all terrabuild operations.
#[derive(Debug, Error, Diagnostic)]
pub enum TerraError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest, catalog or config file.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check Terrabuild.toml and the version catalog for syntax errors"))]
    Manifest { message: String },

    /// A catalog key path does not exist.
    #[error("Unresolved catalog key `{path}` (referenced by {referenced_by})")]
    #[diagnostic(help("Add `{path}` to the version catalog or fix the reference"))]
    UnresolvedKey { path: String, referenced_by: String },

    /// Catalog values reference each other in a loop, or the chain is too deep.
    #[error("Cyclic reference in version catalog: {chain}")]
    CyclicReference { chain: String },

    /// An artifact could not be downloaded or was not found.
    #[error("Failed to fetch {coordinate}: {message}")]
    DependencyFetch { coordinate: String, message: String },

    /// Shading, remapping or archiving failed.
    #[error("Packaging failed: {message}")]
    Packaging { message: String },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type TerraResult<T> = miette::Result<T>;
