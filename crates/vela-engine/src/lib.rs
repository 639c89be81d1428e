//! Vela Language Engine
//!
//! This crate provides the Vela language implementation used by the
//! launcher:
//! - **Lexer/Parser**: logos-based lexer and recursive descent parser
//!   (`lexer`, `parser`, `ast` modules)
//! - **Interpreter**: tree-walking evaluator with module imports and the
//!   implicit `MODULE` / `FILE` / `ARGS` globals (`interp` module)
//! - **Profiler**: scoped profiling sessions with line/call metrics,
//!   line-offset translation, and report rendering (`profiler` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use vela_engine::{Interpreter, OutputSink, Profiler, MAIN_RUN_NAME};
//!
//! let profiler = Arc::new(Profiler::new());
//! let mut interp = Interpreter::new(resolver, profiler, OutputSink::stdout());
//! interp.run_main("print(1+1)", "a.vela".as_ref(), MAIN_RUN_NAME, &argv)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// AST node definitions
pub mod ast;

/// Source-annotated syntax error rendering
pub mod diagnostics;

/// Engine error taxonomy
pub mod error;

/// Tree-walking interpreter and module resolution seam
pub mod interp;

/// Logos-based lexer
pub mod lexer;

/// Output sink for `print` and reports
pub mod output;

/// Recursive descent parser
pub mod parser;

/// Profiling sessions, recorded keys, and reports
pub mod profiler;

/// Token and span definitions
pub mod token;

/// Runtime values
pub mod value;

pub use error::EngineError;
pub use interp::{
    Interpreter, ModuleResolver, NativeModule, ResolveError, ResolvedModule, MAIN_RUN_NAME,
};
pub use output::{CapturedOutput, OutputSink};
pub use profiler::Profiler;
pub use value::Value;
