//! Launcher error types.

use crate::manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or running a target.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The original source file could not be read. Fatal before any
    /// instrumentation or execution happens.
    #[error("failed to read {path}: {source}")]
    SourceRead {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The ephemeral instrumentation artifact could not be created or
    /// written. Fatal before execution.
    #[error("failed to write instrumented artifact: {0}")]
    ArtifactWrite(#[source] std::io::Error),

    /// A module name could not be resolved to a source file.
    #[error(transparent)]
    Resolve(#[from] vela_engine::ResolveError),

    /// The running target raised an error. Propagated after the profiling
    /// session closes and reports are emitted.
    #[error(transparent)]
    Target(#[from] vela_engine::EngineError),

    /// Bad project manifest.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Other I/O error in the launcher itself.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
