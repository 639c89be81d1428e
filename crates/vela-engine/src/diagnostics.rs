//! Source-annotated rendering of lex and parse errors.
//!
//! Uses `codespan-reporting` to print the offending line with a caret under
//! the failing span, the same way the rest of the toolchain reports syntax
//! problems.

use crate::token::Span;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

/// Emit a syntax error diagnostic to stderr.
///
/// Spans are clamped to the source, so degenerate ranges (e.g. an error
/// reported at end of input) render instead of panicking inside codespan.
pub fn emit_syntax_error(path: &str, source: &str, message: &str, span: Span) {
    let file = SimpleFile::new(path, source);

    let max = source.len();
    let start = span.start.min(max);
    let end = span.end.max(start).min(max);

    let diagnostic = Diagnostic::error()
        .with_message(message)
        .with_labels(vec![Label::primary((), start..end)]);

    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    let _ = term::emit(&mut writer.lock(), &config, &file, &diagnostic);
}
