//! Scoped profiling sessions for the Vela interpreter.
//!
//! Cheap when idle (single `AtomicBool` check in the execution hot path).
//! One session may be open per profiler handle at a time; the launcher
//! creates exactly one handle per process. Sessions follow scoped
//! acquisition: [`Profiler::begin_session`] returns a guard whose drop
//! closes the session and publishes the aggregated data on every exit
//! path, including error paths, so partial results survive failures.
//!
//! Recorded keys are `(line, file, text)` triples for per-line metrics and
//! `(name, file)` pairs for per-call metrics. When execution happened
//! inside an instrumented artifact, [`shift_line_keys`] translates the
//! recorded line numbers back to the original source coordinates.

pub mod report;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Recorded keys and metrics
// ---------------------------------------------------------------------------

/// Key of one recorded source line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    /// 1-based line number as recorded.
    pub line: u32,
    /// File the line belongs to.
    pub file: String,
    /// Text of the line at record time.
    pub text: String,
}

/// Accumulated metrics for one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMetrics {
    /// Number of executions.
    pub hits: u64,
    /// Total wall-clock time spent.
    pub total: Duration,
}

/// Key of one recorded callable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    /// Function name.
    pub name: String,
    /// File the function was declared in.
    pub file: String,
}

/// Accumulated metrics for one callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallMetrics {
    /// Number of invocations.
    pub calls: u64,
    /// Total wall-clock time spent, including callees.
    pub total: Duration,
}

/// Session usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A second session was opened while one is active.
    #[error("a profiling session is already active")]
    AlreadyActive,
}

// ---------------------------------------------------------------------------
// Profiler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionData {
    lines: FxHashMap<LineKey, LineMetrics>,
    calls: FxHashMap<CallKey, CallMetrics>,
}

/// Aggregated results of a closed session, read-only from here on.
#[derive(Debug, Clone, Default)]
pub struct FinishedProfile {
    /// Per-line metrics keyed by (line, file, text).
    pub lines: FxHashMap<LineKey, LineMetrics>,
    /// Per-callable metrics keyed by (name, file).
    pub calls: FxHashMap<CallKey, CallMetrics>,
    /// Wall-clock duration of the session.
    pub wall: Duration,
}

impl FinishedProfile {
    /// Translate recorded line keys for `file` back by `offset` lines.
    pub fn shift_lines(&mut self, offset: u32, file: &str) {
        let lines = std::mem::take(&mut self.lines);
        self.lines = shift_line_keys(lines, offset, file);
    }
}

/// Profiling facility shared between the interpreter and the launcher.
pub struct Profiler {
    /// Fast check — single atomic load in the hot path.
    active: AtomicBool,
    /// Data of the open session.
    current: Mutex<SessionData>,
    /// Start instant of the open session.
    started: Mutex<Option<Instant>>,
    /// Results of the most recently closed session.
    finished: Mutex<Option<FinishedProfile>>,
}

impl Profiler {
    /// Create a profiler with no session open.
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            current: Mutex::new(SessionData::default()),
            started: Mutex::new(None),
            finished: Mutex::new(None),
        }
    }

    /// Whether a session is currently open.
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Open a session.
    ///
    /// Fails with [`SessionError::AlreadyActive`] if one is open; the open
    /// session's recorded data is left untouched in that case. The
    /// returned guard closes the session when dropped.
    pub fn begin_session(self: &Arc<Self>) -> Result<SessionGuard, SessionError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::AlreadyActive);
        }
        *self.current.lock() = SessionData::default();
        *self.started.lock() = Some(Instant::now());
        Ok(SessionGuard {
            profiler: Arc::clone(self),
        })
    }

    /// Record one execution of a source line. No-op unless a session is open.
    pub fn record_line(&self, file: &str, line: u32, text: &str, elapsed: Duration) {
        if !self.is_active() {
            return;
        }
        let mut current = self.current.lock();
        let metrics = current
            .lines
            .entry(LineKey {
                line,
                file: file.to_string(),
                text: text.to_string(),
            })
            .or_default();
        metrics.hits += 1;
        metrics.total += elapsed;
    }

    /// Record one invocation of a callable. No-op unless a session is open.
    pub fn record_call(&self, name: &str, file: &str, elapsed: Duration) {
        if !self.is_active() {
            return;
        }
        let mut current = self.current.lock();
        let metrics = current
            .calls
            .entry(CallKey {
                name: name.to_string(),
                file: file.to_string(),
            })
            .or_default();
        metrics.calls += 1;
        metrics.total += elapsed;
    }

    /// Snapshot of the most recently closed session, if any.
    pub fn finished(&self) -> Option<FinishedProfile> {
        self.finished.lock().clone()
    }

    /// Translate the closed session's line keys for `file` back by
    /// `offset`. Returns false when no session has finished yet.
    pub fn shift_finished_lines(&self, offset: u32, file: &str) -> bool {
        let mut finished = self.finished.lock();
        match finished.as_mut() {
            Some(profile) => {
                profile.shift_lines(offset, file);
                true
            }
            None => false,
        }
    }

    fn close(&self) {
        let data = std::mem::take(&mut *self.current.lock());
        let wall = self
            .started
            .lock()
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.active.store(false, Ordering::Release);
        *self.finished.lock() = Some(FinishedProfile {
            lines: data.lines,
            calls: data.calls,
            wall,
        });
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for an open session; dropping it closes the session and publishes
/// the aggregated data.
pub struct SessionGuard {
    profiler: Arc<Profiler>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard").finish_non_exhaustive()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.profiler.close();
    }
}

// ---------------------------------------------------------------------------
// Line offset translation
// ---------------------------------------------------------------------------

/// Re-key line metrics of `file` at `recorded_line - offset`.
///
/// Pure with respect to entries: nothing is dropped or merged; keys for
/// other files pass through untouched. Two distinct recorded lines
/// collapsing onto one translated key would silently merge metrics, so
/// that case is treated as a programmer error.
pub fn shift_line_keys(
    lines: FxHashMap<LineKey, LineMetrics>,
    offset: u32,
    file: &str,
) -> FxHashMap<LineKey, LineMetrics> {
    let mut shifted = FxHashMap::default();
    for (key, metrics) in lines {
        let key = if key.file == file {
            let line = key
                .line
                .checked_sub(offset)
                .expect("recorded line precedes the instrumentation header");
            LineKey { line, ..key }
        } else {
            key
        };
        let previous = shifted.insert(key, metrics);
        assert!(
            previous.is_none(),
            "line offset translation produced a key collision"
        );
    }
    shifted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn line_key(line: u32, file: &str, text: &str) -> LineKey {
        LineKey {
            line,
            file: file.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_profiler_inactive_by_default() {
        let profiler = Profiler::new();
        assert!(!profiler.is_active());
        assert!(profiler.finished().is_none());
    }

    #[test]
    fn test_session_lifecycle() {
        let profiler = Arc::new(Profiler::new());
        let session = profiler.begin_session().expect("begin failed");
        assert!(profiler.is_active());
        drop(session);
        assert!(!profiler.is_active());
        assert!(profiler.finished().is_some());
    }

    #[test]
    fn test_second_session_is_a_usage_error() {
        let profiler = Arc::new(Profiler::new());
        let _session = profiler.begin_session().expect("begin failed");
        profiler.record_line("a.vela", 1, "print(1)", Duration::from_micros(5));

        let err = profiler.begin_session().unwrap_err();
        assert_eq!(err, SessionError::AlreadyActive);

        // The first session's data is intact
        assert!(profiler.is_active());
        drop(_session);
        let finished = profiler.finished().expect("missing finished profile");
        assert_eq!(finished.lines.len(), 1);
        let metrics = finished
            .lines
            .get(&line_key(1, "a.vela", "print(1)"))
            .expect("missing recorded line");
        assert_eq!(metrics.hits, 1);
    }

    #[test]
    fn test_recording_requires_open_session() {
        let profiler = Arc::new(Profiler::new());
        profiler.record_line("a.vela", 1, "print(1)", Duration::from_micros(5));
        profiler.record_call("f", "a.vela", Duration::from_micros(5));

        let session = profiler.begin_session().expect("begin failed");
        drop(session);
        let finished = profiler.finished().expect("missing finished profile");
        assert!(finished.lines.is_empty());
        assert!(finished.calls.is_empty());
    }

    #[test]
    fn test_hits_accumulate_per_key() {
        let profiler = Arc::new(Profiler::new());
        let session = profiler.begin_session().expect("begin failed");
        for _ in 0..3 {
            profiler.record_line("a.vela", 4, "x = x + 1", Duration::from_micros(2));
        }
        profiler.record_call("main", "a.vela", Duration::from_micros(10));
        drop(session);

        let finished = profiler.finished().expect("missing finished profile");
        let line = finished
            .lines
            .get(&line_key(4, "a.vela", "x = x + 1"))
            .expect("missing recorded line");
        assert_eq!(line.hits, 3);
        assert_eq!(line.total, Duration::from_micros(6));

        let call = finished
            .calls
            .get(&CallKey {
                name: "main".to_string(),
                file: "a.vela".to_string(),
            })
            .expect("missing recorded call");
        assert_eq!(call.calls, 1);
    }

    #[test]
    fn test_shift_line_keys_invariant() {
        let mut lines = FxHashMap::default();
        lines.insert(
            line_key(3, "artifact.vela", "    print(1+1)"),
            LineMetrics {
                hits: 1,
                total: Duration::from_micros(9),
            },
        );
        lines.insert(
            line_key(5, "other.vela", "helper()"),
            LineMetrics {
                hits: 2,
                total: Duration::from_micros(4),
            },
        );

        let shifted = shift_line_keys(lines, 2, "artifact.vela");
        assert_eq!(shifted.len(), 2);
        // original_line == recorded_line - offset for the artifact's keys
        assert!(shifted.contains_key(&line_key(1, "artifact.vela", "    print(1+1)")));
        // foreign files pass through untouched
        assert!(shifted.contains_key(&line_key(5, "other.vela", "helper()")));
    }

    #[test]
    #[should_panic(expected = "precedes the instrumentation header")]
    fn test_shift_below_header_is_loud() {
        let mut lines = FxHashMap::default();
        // Recorded line 1 cannot come from the wrapped body; shifting it
        // past zero is a programmer error, not something to clamp.
        lines.insert(line_key(1, "a.vela", "x"), LineMetrics::default());
        let _ = shift_line_keys(lines, 2, "a.vela");
    }

    #[test]
    fn test_finished_profile_shift_is_idempotent_per_call_only() {
        let profiler = Arc::new(Profiler::new());
        let session = profiler.begin_session().expect("begin failed");
        profiler.record_line("f.vela", 10, "work()", Duration::from_micros(1));
        drop(session);

        assert!(profiler.shift_finished_lines(2, "f.vela"));
        let finished = profiler.finished().expect("missing finished profile");
        assert!(finished.lines.contains_key(&line_key(8, "f.vela", "work()")));
    }

    #[test]
    fn test_shift_without_finished_session() {
        let profiler = Profiler::new();
        assert!(!profiler.shift_finished_lines(2, "f.vela"));
    }
}
