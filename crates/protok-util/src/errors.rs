use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all protok operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ProtokError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed descriptor, conflicting variants, or an unknown platform.
    /// Surfaced before any resolution starts.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the protoc and plugin descriptors in your build configuration"))]
    Configuration { message: String },

    /// Artifact, URI, host-path lookup, or platform-classifier failure.
    /// The message names the coordinate, URI, or path that failed.
    #[error("Resolution failed: {message}")]
    Resolution { message: String },

    /// Digest mismatch on a fetched resource. Always fatal.
    #[error("Integrity check failed: {message}")]
    Integrity { message: String },

    /// Archive open or copy failure.
    #[error("Extraction failed: {message}")]
    Extraction { message: String },

    /// Permissions or I/O failure while walking a source root.
    #[error("Source scan failed: {message}")]
    Scan { message: String },

    /// Incremental-cache write failure. Read failures are a cache miss,
    /// not an error.
    #[error("Incremental cache error: {message}")]
    Cache { message: String },

    /// Non-zero exit from protoc.
    #[error("protoc execution failed: {message}")]
    Execution { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ProtokResult<T> = miette::Result<T>;
