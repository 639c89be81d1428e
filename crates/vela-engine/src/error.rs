//! Engine error types.

use crate::interp::ResolveError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::profiler::SessionError;
use thiserror::Error;

/// Errors that can occur while parsing or executing a module.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Lexical error, with the file it occurred in
    #[error("{file}: {error}")]
    Lex {
        /// Source file.
        file: String,
        /// Underlying lexer error.
        error: LexError,
    },

    /// Parse error, with the file it occurred in
    #[error("{file}: {error}")]
    Parse {
        /// Source file.
        file: String,
        /// Underlying parser error.
        error: ParseError,
    },

    /// Error raised by running target code
    #[error("runtime error at {file}:{line}: {message}")]
    Runtime {
        /// Description of the failure.
        message: String,
        /// File of the failing statement or expression.
        file: String,
        /// Line of the failing statement or expression.
        line: u32,
    },

    /// The target requested process termination via `exit(code)`
    #[error("target exited with status {0}")]
    Exit(i32),

    /// Profiling session usage error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Module resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl EngineError {
    /// Build a runtime error at a source location.
    pub fn runtime_at(message: impl Into<String>, file: &str, line: u32) -> Self {
        EngineError::Runtime {
            message: message.into(),
            file: file.to_string(),
            line,
        }
    }
}
