//! Styled stderr output for launcher failures.
//!
//! Uses `termcolor` for cross-platform colored terminal output and
//! respects the `NO_COLOR` environment variable.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve the color choice from the environment.
pub fn color_choice() -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Write `error: <message>` to stderr with a red, bold prefix.
pub fn stderr_error(message: &str) {
    let stream = StandardStream::stderr(color_choice());
    let mut stream = stream.lock();

    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    let _ = stream.set_color(&spec);
    let _ = write!(stream, "error");
    let _ = stream.reset();
    let _ = writeln!(stream, ": {}", message);
}
