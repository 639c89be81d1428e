//! Source rewriter: instrumented artifact synthesis.
//!
//! Wraps a target's source in a profiling session without changing its
//! observable behavior:
//!
//! ```text
//! import profiler          <- SESSION_HEADER[0]
//! profile {                <- SESSION_HEADER[1]
//!     <original source, re-indented one level>
//! }
//! profiler.shift_lines(2)  <- remap trailer (offset = SESSION_HEADER.len())
//! profiler.report_lines()
//! profiler.report_calls()  <- only when a per-callable report was requested
//! ```
//!
//! Every line recorded inside the wrapped body lands `SESSION_HEADER.len()`
//! lines below its original position; the trailer's `shift_lines` call
//! translates the recorded keys back before reporting. The offset is
//! computed from the header array, never written as a bare constant, so
//! header edits cannot desynchronize the subtraction.
//!
//! The rewritten text is persisted to a uniquely-named, auto-deleting
//! tempfile carrying the original file's suffix, so module loading treats
//! it like any other source file. The artifact lives until the owning
//! [`InstrumentedScript`] drops, after the run region exits, on success
//! and failure alike.

use crate::error::LaunchError;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Lines prepended ahead of the wrapped body.
pub const SESSION_HEADER: [&str; 2] = ["import profiler", "profile {"];

/// One indentation level applied to the wrapped body.
const INDENT: &str = "    ";

/// Number of lines the wrapped body is shifted down by.
pub fn line_offset() -> u32 {
    SESSION_HEADER.len() as u32
}

/// An instrumented copy of a target script, backed by an auto-deleting
/// tempfile.
pub struct InstrumentedScript {
    artifact: NamedTempFile,
    offset: u32,
}

impl InstrumentedScript {
    /// Path of the ephemeral artifact.
    pub fn path(&self) -> &Path {
        self.artifact.path()
    }

    /// Line offset introduced by the instrumentation header.
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

/// Produce the instrumented variant of `source`.
///
/// `include_call_report` additionally emits the per-callable report call
/// in the trailer (set when full profiling was requested alongside line
/// profiling).
pub fn instrument_source(source: &str, include_call_report: bool) -> String {
    let offset = line_offset();
    let mut out = String::with_capacity(source.len() + 128);

    for line in SESSION_HEADER {
        out.push_str(line);
        out.push('\n');
    }
    for line in source.lines() {
        out.push_str(INDENT);
        out.push_str(&normalize_indentation(line));
        out.push('\n');
    }
    out.push_str("}\n");
    out.push_str(&format!("profiler.shift_lines({})\n", offset));
    out.push_str("profiler.report_lines()\n");
    if include_call_report {
        out.push_str("profiler.report_calls()\n");
    }
    out
}

/// Instrument the script at `path` and persist the result to an ephemeral
/// artifact with the same suffix.
pub fn instrument_file(
    path: &Path,
    include_call_report: bool,
) -> Result<InstrumentedScript, LaunchError> {
    let source = std::fs::read_to_string(path).map_err(|source| LaunchError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;

    let text = instrument_source(&source, include_call_report);

    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| format!(".{}", crate::loader::SOURCE_EXTENSION));

    let mut artifact = tempfile::Builder::new()
        .prefix("vela-instrumented-")
        .suffix(&suffix)
        .tempfile()
        .map_err(LaunchError::ArtifactWrite)?;
    artifact
        .write_all(text.as_bytes())
        .map_err(LaunchError::ArtifactWrite)?;
    artifact.flush().map_err(LaunchError::ArtifactWrite)?;

    Ok(InstrumentedScript {
        artifact,
        offset: line_offset(),
    })
}

/// Normalize leading tabs to four-space units.
///
/// Only the indentation is touched; tabs inside the line (e.g. in string
/// literals) stay as written. This keeps mixed tab/space files valid once
/// the body is nested under the wrapping block.
fn normalize_indentation(line: &str) -> Cow<'_, str> {
    let indent_len = line
        .len()
        .saturating_sub(line.trim_start_matches([' ', '\t']).len());
    let (indent, rest) = line.split_at(indent_len);
    if !indent.contains('\t') {
        return Cow::Borrowed(line);
    }
    let mut normalized = String::with_capacity(line.len() + 8);
    for c in indent.chars() {
        match c {
            '\t' => normalized.push_str(INDENT),
            other => normalized.push(other),
        }
    }
    normalized.push_str(rest);
    Cow::Owned(normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_offset_matches_header() {
        assert_eq!(line_offset(), SESSION_HEADER.len() as u32);
        assert_eq!(line_offset(), 2);
    }

    #[test]
    fn test_instrumented_layout() {
        let text = instrument_source("print(1+1)", false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "import profiler",
                "profile {",
                "    print(1+1)",
                "}",
                "profiler.shift_lines(2)",
                "profiler.report_lines()",
            ]
        );
    }

    #[test]
    fn test_call_report_is_conditional() {
        let without = instrument_source("print(1)", false);
        let with = instrument_source("print(1)", true);
        assert!(!without.contains("report_calls"));
        assert!(with.ends_with("profiler.report_calls()\n"));
    }

    #[test]
    fn test_body_lines_shift_by_offset() {
        let source = "let a = 1\nlet b = 2\nprint(a + b)";
        let text = instrument_source(source, false);
        let lines: Vec<&str> = text.lines().collect();
        for (i, original) in source.lines().enumerate() {
            let wrapped = lines[i + line_offset() as usize];
            assert_eq!(wrapped, format!("    {}", original));
        }
    }

    #[test]
    fn test_leading_tabs_normalize() {
        let text = instrument_source("\tprint(1)\n\t\tprint(2)", false);
        assert!(text.contains("        print(1)"));
        assert!(text.contains("            print(2)"));
        assert!(!text.contains('\t'));
    }

    #[test]
    fn test_tabs_inside_strings_survive() {
        let text = instrument_source("print(\"a\\tb\")", false);
        // The escape sequence is source text, not a literal tab
        assert!(text.contains("print(\"a\\tb\")"));
    }

    #[test]
    fn test_empty_source_still_wraps() {
        let text = instrument_source("", false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "import profiler");
        assert_eq!(lines[1], "profile {");
        assert_eq!(lines[2], "}");
    }

    #[test]
    fn test_artifact_has_matching_suffix_and_content() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let script = dir.path().join("target.vela");
        std::fs::write(&script, "print(1+1)\n").expect("write failed");

        let instrumented = instrument_file(&script, false).expect("instrument failed");
        let artifact_path = instrumented.path().to_path_buf();
        assert!(artifact_path
            .extension()
            .is_some_and(|ext| ext == "vela"));
        assert_ne!(artifact_path, script);

        let contents = std::fs::read_to_string(&artifact_path).expect("read failed");
        assert!(contents.starts_with("import profiler\nprofile {\n"));
        assert!(contents.contains("    print(1+1)"));
    }

    #[test]
    fn test_artifact_deleted_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let script = dir.path().join("target.vela");
        std::fs::write(&script, "print(1)\n").expect("write failed");

        let instrumented = instrument_file(&script, false).expect("instrument failed");
        let artifact_path = instrumented.path().to_path_buf();
        assert!(artifact_path.exists());

        drop(instrumented);
        assert!(!artifact_path.exists());
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let missing = PathBuf::from("definitely/not/here.vela");
        match instrument_file(&missing, false) {
            Err(LaunchError::SourceRead { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected SourceRead, got {:?}", other.err()),
        }
    }
}
