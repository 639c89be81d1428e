//! Text report rendering for finished profiling sessions.
//!
//! Both renderers are deterministic: entries are fully ordered before
//! formatting so repeated runs over the same data print identically.

use crate::profiler::{CallKey, CallMetrics, FinishedProfile, LineKey, LineMetrics};
use std::fmt::Write;
use std::time::Duration;

/// Render the aggregate per-line report.
///
/// Entries are grouped by file and ordered by line number within a file.
pub fn render_line_report(profile: &FinishedProfile) -> String {
    let mut entries: Vec<(&LineKey, &LineMetrics)> = profile.lines.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "== line profile ({} lines, wall {}) ==",
        entries.len(),
        format_duration(profile.wall)
    );

    let mut current_file: Option<&str> = None;
    for (key, metrics) in entries {
        if current_file != Some(key.file.as_str()) {
            let _ = writeln!(out, "{}:", key.file);
            current_file = Some(key.file.as_str());
        }
        let _ = writeln!(
            out,
            "  {:>6}  {:>8} hits  {:>10}  {}",
            key.line,
            metrics.hits,
            format_duration(metrics.total),
            key.text.trim_end()
        );
    }
    out
}

/// Render the per-callable report, ordered by total time (descending),
/// then by name and file for a stable ordering among equals.
pub fn render_call_report(profile: &FinishedProfile) -> String {
    let mut entries: Vec<(&CallKey, &CallMetrics)> = profile.calls.iter().collect();
    entries.sort_by(|(ak, am), (bk, bm)| {
        bm.total
            .cmp(&am.total)
            .then_with(|| ak.name.cmp(&bk.name))
            .then_with(|| ak.file.cmp(&bk.file))
    });

    let mut out = String::new();
    let _ = writeln!(
        out,
        "== per-function profile ({} functions) ==",
        entries.len()
    );

    for (key, metrics) in entries {
        let per_call = metrics.total / metrics.calls.max(1) as u32;
        let _ = writeln!(
            out,
            "  {:>8} calls  {:>10} total  {:>10}/call  {}  ({})",
            metrics.calls,
            format_duration(metrics.total),
            format_duration(per_call),
            key.name,
            key.file
        );
    }
    out
}

/// Fixed-precision duration formatting so report columns line up.
fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros >= 1_000_000 {
        format!("{:.3}s", d.as_secs_f64())
    } else if micros >= 1_000 {
        format!("{:.3}ms", micros as f64 / 1_000.0)
    } else {
        format!("{}µs", micros)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn profile_with_lines(entries: &[(u32, &str, &str, u64)]) -> FinishedProfile {
        let mut lines = FxHashMap::default();
        for &(line, file, text, hits) in entries {
            lines.insert(
                LineKey {
                    line,
                    file: file.to_string(),
                    text: text.to_string(),
                },
                LineMetrics {
                    hits,
                    total: Duration::from_micros(hits * 10),
                },
            );
        }
        FinishedProfile {
            lines,
            calls: FxHashMap::default(),
            wall: Duration::from_micros(500),
        }
    }

    #[test]
    fn test_empty_line_report() {
        let report = render_line_report(&FinishedProfile::default());
        assert!(report.starts_with("== line profile (0 lines"));
    }

    #[test]
    fn test_line_report_is_ordered() {
        let profile = profile_with_lines(&[
            (9, "b.vela", "late()", 1),
            (2, "a.vela", "second()", 1),
            (1, "a.vela", "first()", 3),
        ]);
        let report = render_line_report(&profile);

        let first = report.find("first()").expect("missing first()");
        let second = report.find("second()").expect("missing second()");
        let late = report.find("late()").expect("missing late()");
        assert!(first < second && second < late);

        // Hit counts are present
        assert!(report.contains("3 hits"));
    }

    #[test]
    fn test_line_report_groups_by_file() {
        let profile = profile_with_lines(&[(1, "a.vela", "x", 1), (1, "b.vela", "y", 1)]);
        let report = render_line_report(&profile);
        assert!(report.contains("a.vela:"));
        assert!(report.contains("b.vela:"));
    }

    #[test]
    fn test_call_report_orders_by_total_time() {
        let mut calls = FxHashMap::default();
        calls.insert(
            CallKey {
                name: "cheap".to_string(),
                file: "a.vela".to_string(),
            },
            CallMetrics {
                calls: 10,
                total: Duration::from_micros(100),
            },
        );
        calls.insert(
            CallKey {
                name: "hot".to_string(),
                file: "a.vela".to_string(),
            },
            CallMetrics {
                calls: 2,
                total: Duration::from_millis(5),
            },
        );
        let profile = FinishedProfile {
            lines: FxHashMap::default(),
            calls,
            wall: Duration::from_millis(6),
        };

        let report = render_call_report(&profile);
        let hot = report.find("hot").expect("missing hot");
        let cheap = report.find("cheap").expect("missing cheap");
        assert!(hot < cheap);
        assert!(report.contains("2 calls"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(Duration::from_micros(12)), "12µs");
        assert_eq!(format_duration(Duration::from_micros(1_500)), "1.500ms");
        assert_eq!(format_duration(Duration::from_millis(2_500)), "2.500s");
    }
}
