//! Vela Runtime
//!
//! Binds the Vela engine to the host environment: module loading over
//! search paths, the source rewriter that synthesizes instrumented
//! artifacts, the execution shim that unifies script-mode and module-mode
//! invocation, and the transparent-acceleration interception.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Transparent acceleration interception (`install()`)
pub mod accel;

/// Launcher error taxonomy
pub mod error;

/// Module resolution over search paths
pub mod loader;

/// Project manifest (vela.toml)
pub mod manifest;

/// Instrumented artifact synthesis
pub mod rewrite;

/// Execution shim (`RunRequest`)
pub mod shim;

pub use error::LaunchError;
pub use loader::ModuleLoader;
pub use rewrite::InstrumentedScript;
pub use shim::{Entry, RunRequest};
