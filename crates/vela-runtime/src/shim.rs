//! Execution shim: run a target exactly as if it were invoked directly.
//!
//! Both invocation forms collapse into one [`RunRequest`] value carrying
//! the entry point and the argument vector the target will observe; no
//! ambient mutable state. Script mode puts the script path in `argv[0]`;
//! module mode puts the module name there. Either way the resolved file
//! runs under the run name [`MAIN_RUN_NAME`], so `if MODULE == "main"`
//! guards fire exactly as they would under direct invocation, and imports
//! resolve relative to the executed file's own directory.

use crate::error::LaunchError;
use crate::loader::ModuleLoader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use vela_engine::{Interpreter, OutputSink, Profiler, MAIN_RUN_NAME};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A script file, by path.
    Script(PathBuf),
    /// An importable module, by dotted name.
    Module(String),
}

/// One resolved invocation: entry point plus the target's argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Entry point.
    pub entry: Entry,
    /// Argument vector as the target will see it (`ARGS`).
    pub argv: Vec<String>,
}

impl RunRequest {
    /// Script-mode request: `argv = [script_path] + trailing`.
    pub fn for_script(path: impl Into<PathBuf>, trailing: &[String]) -> Self {
        let path = path.into();
        let mut argv = vec![path.display().to_string()];
        argv.extend(trailing.iter().cloned());
        Self {
            entry: Entry::Script(path),
            argv,
        }
    }

    /// Module-mode request: `argv = [module_name] + trailing`.
    pub fn for_module(name: impl Into<String>, trailing: &[String]) -> Self {
        let name = name.into();
        let mut argv = vec![name.clone()];
        argv.extend(trailing.iter().cloned());
        Self {
            entry: Entry::Module(name),
            argv,
        }
    }

    /// Request with an explicit argument vector (used when the entry point
    /// is an instrumented artifact standing in for the real target).
    pub fn with_argv(entry: Entry, argv: Vec<String>) -> Self {
        Self { entry, argv }
    }
}

/// Run the request's target as the main program.
///
/// Errors from the target are propagated, not swallowed; the caller
/// decides what reporting happens around them.
pub fn execute(
    request: &RunRequest,
    loader: &Rc<ModuleLoader>,
    profiler: &Arc<Profiler>,
    out: &OutputSink,
) -> Result<(), LaunchError> {
    let path = resolve_entry_path(request, loader)?;

    let source = std::fs::read_to_string(&path).map_err(|source| LaunchError::SourceRead {
        path: path.clone(),
        source,
    })?;

    let mut interp = Interpreter::new(loader.clone(), profiler.clone(), out.clone());
    interp.run_main(&source, &path, MAIN_RUN_NAME, &request.argv)?;
    Ok(())
}

/// Resolve the request's entry point to the file that will execute.
pub fn resolve_entry_path(
    request: &RunRequest,
    loader: &Rc<ModuleLoader>,
) -> Result<PathBuf, LaunchError> {
    match &request.entry {
        Entry::Script(path) => Ok(path.clone()),
        Entry::Module(name) => loader.resolve_entry(name),
    }
}

/// Resolve a target named on the command line to its source path without
/// running it (used by the rewriter to find what to instrument).
pub fn resolve_target_source(
    module: Option<&str>,
    script: Option<&Path>,
    loader: &Rc<ModuleLoader>,
) -> Result<PathBuf, LaunchError> {
    match (module, script) {
        (Some(name), _) => loader.resolve_entry(name),
        (None, Some(path)) => Ok(path.to_path_buf()),
        (None, None) => Err(LaunchError::Resolve(vela_engine::ResolveError::NotFound {
            name: "<missing target>".to_string(),
            searched: "  (no script path or module name given)".to_string(),
        })),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_script_request_argv_matches_direct_invocation() {
        let request = RunRequest::for_script("app.vela", &strings(&["--fast", "input.csv"]));
        assert_eq!(request.argv, strings(&["app.vela", "--fast", "input.csv"]));
        assert_eq!(request.entry, Entry::Script(PathBuf::from("app.vela")));
    }

    #[test]
    fn test_module_request_argv_starts_with_module_name() {
        let request = RunRequest::for_module("pkg.mod", &strings(&["x"]));
        assert_eq!(request.argv, strings(&["pkg.mod", "x"]));
        assert_eq!(request.entry, Entry::Module("pkg.mod".to_string()));
    }

    #[test]
    fn test_execute_runs_script_with_main_run_name() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let script = dir.path().join("app.vela");
        std::fs::write(&script, "print(MODULE)\nprint(ARGS[1])\n").expect("write failed");

        let loader = Rc::new(ModuleLoader::new(vec![dir.path().to_path_buf()]));
        let profiler = Arc::new(Profiler::new());
        let (out, captured) = OutputSink::capture();

        let request = RunRequest::for_script(&script, &strings(&["hello"]));
        execute(&request, &loader, &profiler, &out).expect("execute failed");
        assert_eq!(captured.contents(), "main\nhello\n");
    }

    #[test]
    fn test_execute_missing_script_is_source_read_error() {
        let loader = Rc::new(ModuleLoader::new(vec![]));
        let profiler = Arc::new(Profiler::new());
        let (out, _) = OutputSink::capture();

        let request = RunRequest::for_script("no/such/file.vela", &[]);
        match execute(&request, &loader, &profiler, &out) {
            Err(LaunchError::SourceRead { path, .. }) => {
                assert_eq!(path, PathBuf::from("no/such/file.vela"));
            }
            other => panic!("expected SourceRead, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_execute_unknown_module_is_resolve_error() {
        let loader = Rc::new(ModuleLoader::new(vec![]));
        let profiler = Arc::new(Profiler::new());
        let (out, _) = OutputSink::capture();

        let request = RunRequest::for_module("ghost", &[]);
        match execute(&request, &loader, &profiler, &out) {
            Err(LaunchError::Resolve(_)) => {}
            other => panic!("expected Resolve, got {:?}", other.err()),
        }
    }
}
