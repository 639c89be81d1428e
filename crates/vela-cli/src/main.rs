//! `vela` — instrumenting launcher for Vela targets.
//!
//! Runs a script file or an importable module exactly as if it had been
//! invoked directly, with transparent acceleration installed first and,
//! optionally, a profiling session wrapped around the run:
//!
//! ```text
//! vela [-m MODULE] [--profile] [--line-profile] target_args...
//! ```
//!
//! `--line-profile` routes the target through the source rewriter and
//! prints a line report with corrected line numbers; `--profile` wraps the
//! unmodified target in a session and prints aggregate and per-function
//! reports. With both flags, the rewritten target also emits the
//! per-function report. The process exit code mirrors the target's own
//! termination status.

mod output;

use clap::Parser;
use std::path::Path;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use vela_engine::profiler::report;
use vela_engine::{diagnostics, EngineError, OutputSink, Profiler};
use vela_runtime::rewrite::{self, InstrumentedScript};
use vela_runtime::{accel, shim, Entry, LaunchError, ModuleLoader, RunRequest};

/// Launcher command line.
#[derive(Parser, Debug)]
#[command(
    name = "vela",
    version,
    about = "Run a Vela target in transparent accelerated mode, optionally under a profiling session"
)]
struct LaunchArgs {
    /// Run the named module as the main program
    #[arg(short = 'm', long = "module", value_name = "MODULE")]
    module: Option<String>,

    /// Wrap execution in a profiling session and print aggregate and
    /// per-function reports on completion
    #[arg(long)]
    profile: bool,

    /// Rewrite the target for per-line profiling and print an aggregate
    /// report with corrected line numbers on completion
    #[arg(long = "line-profile")]
    line_profile: bool,

    /// Target script path (script mode) followed by the target's own
    /// arguments; in module mode, all of these belong to the module
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "module"
    )]
    args: Vec<String>,
}

fn main() {
    let args = LaunchArgs::parse();
    match launch(args) {
        Ok(status) => process::exit(status),
        Err(error) => {
            render_error(&error);
            process::exit(1);
        }
    }
}

/// Composition root: install interception, build the run request (through
/// the rewriter when line profiling), execute, and make sure reports come
/// out after the run regardless of how it ended.
fn launch(args: LaunchArgs) -> Result<i32, LaunchError> {
    // Interception must complete before any target code runs.
    accel::install();

    let cwd = std::env::current_dir()?;
    let loader = Rc::new(ModuleLoader::from_dir(&cwd)?);
    let profiler = Arc::new(Profiler::new());
    let out = OutputSink::stdout();

    let trailing = trailing_args(&args);

    let result = if args.line_profile {
        run_line_profiled(&args, &trailing, &loader, &profiler, &out)
    } else if args.profile {
        run_profiled(&args, &trailing, &loader, &profiler, &out)
    } else {
        shim::execute(&request_for(&args, &trailing), &loader, &profiler, &out)
    };

    match result {
        Ok(()) => Ok(0),
        Err(LaunchError::Target(EngineError::Exit(status))) => Ok(status),
        Err(error) => Err(error),
    }
}

/// The target's own arguments: everything in module mode, everything after
/// the script path in script mode.
fn trailing_args(args: &LaunchArgs) -> Vec<String> {
    if args.module.is_some() {
        args.args.clone()
    } else {
        args.args.iter().skip(1).cloned().collect()
    }
}

/// Run request for the unmodified target.
fn request_for(args: &LaunchArgs, trailing: &[String]) -> RunRequest {
    match &args.module {
        Some(name) => RunRequest::for_module(name.clone(), trailing),
        None => RunRequest::for_script(&args.args[0], trailing),
    }
}

/// `--line-profile`: rewrite the target's source, run the ephemeral
/// artifact, and keep it alive until the run region has exited.
fn run_line_profiled(
    args: &LaunchArgs,
    trailing: &[String],
    loader: &Rc<ModuleLoader>,
    profiler: &Arc<Profiler>,
    out: &OutputSink,
) -> Result<(), LaunchError> {
    let target = shim::resolve_target_source(
        args.module.as_deref(),
        args.args.first().map(Path::new),
        loader,
    )?;
    let instrumented = rewrite::instrument_file(&target, args.profile)?;

    let request = match &args.module {
        Some(name) => {
            let mut argv = vec![name.clone()];
            argv.extend(trailing.iter().cloned());
            RunRequest::with_argv(Entry::Script(instrumented.path().to_path_buf()), argv)
        }
        None => RunRequest::for_script(instrumented.path(), trailing),
    };

    let result = shim::execute(&request, loader, profiler, out);
    if result.is_err() {
        // The artifact's trailer never ran; correct the coordinates here
        // so the partial report is not lost.
        emit_failure_report(profiler, &instrumented, args.profile, out);
    }
    drop(instrumented);
    result
}

/// `--profile` without rewriting: a session around the whole run, reports
/// printed afterwards on success and failure alike.
fn run_profiled(
    args: &LaunchArgs,
    trailing: &[String],
    loader: &Rc<ModuleLoader>,
    profiler: &Arc<Profiler>,
    out: &OutputSink,
) -> Result<(), LaunchError> {
    let request = request_for(args, trailing);

    let session = profiler
        .begin_session()
        .map_err(EngineError::from)
        .map_err(LaunchError::from)?;
    let result = shim::execute(&request, loader, profiler, out);
    drop(session);

    // Reports follow the run on success and on target failure; failures
    // that aborted before execution have nothing to report.
    if matches!(&result, Ok(()) | Err(LaunchError::Target(_))) {
        if let Some(finished) = profiler.finished() {
            out.write_str(&report::render_line_report(&finished));
            out.write_str(&report::render_call_report(&finished));
        }
    }
    result
}

fn emit_failure_report(
    profiler: &Arc<Profiler>,
    instrumented: &InstrumentedScript,
    include_calls: bool,
    out: &OutputSink,
) {
    let artifact_file = instrumented.path().display().to_string();
    if !profiler.shift_finished_lines(instrumented.offset(), &artifact_file) {
        return;
    }
    if let Some(finished) = profiler.finished() {
        out.write_str(&report::render_line_report(&finished));
        if include_calls {
            out.write_str(&report::render_call_report(&finished));
        }
    }
}

fn render_error(error: &LaunchError) {
    match error {
        LaunchError::Target(EngineError::Parse { file, error }) => {
            render_syntax_error(file, &error.message, error.span)
        }
        LaunchError::Target(EngineError::Lex { file, error }) => {
            render_syntax_error(file, &error.message, error.span)
        }
        other => output::stderr_error(&other.to_string()),
    }
}

fn render_syntax_error(file: &str, message: &str, span: vela_engine::token::Span) {
    match std::fs::read_to_string(file) {
        Ok(source) => diagnostics::emit_syntax_error(file, &source, message, span),
        Err(_) => output::stderr_error(&format!(
            "{}: {} (line {}, column {})",
            file, message, span.line, span.column
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> LaunchArgs {
        LaunchArgs::try_parse_from(argv.iter().copied()).expect("parse failed")
    }

    #[test]
    fn test_script_mode_parsing() {
        let args = parse(&["vela", "a.vela", "--flag", "input"]);
        assert!(args.module.is_none());
        assert!(!args.profile && !args.line_profile);
        // Flags after the script path belong to the target
        assert_eq!(args.args, vec!["a.vela", "--flag", "input"]);
        assert_eq!(trailing_args(&args), vec!["--flag", "input"]);
    }

    #[test]
    fn test_module_mode_parsing() {
        let args = parse(&["vela", "-m", "pkg.mod", "--profile", "x"]);
        assert_eq!(args.module.as_deref(), Some("pkg.mod"));
        assert!(args.profile);
        assert_eq!(args.args, vec!["x"]);
        // In module mode every positional is the target's argument
        assert_eq!(trailing_args(&args), vec!["x"]);
    }

    #[test]
    fn test_launcher_flags_precede_the_target() {
        let args = parse(&["vela", "--line-profile", "--profile", "a.vela"]);
        assert!(args.profile && args.line_profile);
        assert_eq!(args.args, vec!["a.vela"]);
    }

    #[test]
    fn test_target_is_required_without_module() {
        assert!(LaunchArgs::try_parse_from(["vela"]).is_err());
        assert!(LaunchArgs::try_parse_from(["vela", "-m", "tool"]).is_ok());
    }

    #[test]
    fn test_script_request_argv() {
        let args = parse(&["vela", "a.vela", "one", "two"]);
        let trailing = trailing_args(&args);
        let request = request_for(&args, &trailing);
        assert_eq!(request.argv, vec!["a.vela", "one", "two"]);
        assert!(matches!(request.entry, Entry::Script(_)));
    }

    #[test]
    fn test_module_request_argv() {
        let args = parse(&["vela", "-m", "tool", "one"]);
        let trailing = trailing_args(&args);
        let request = request_for(&args, &trailing);
        assert_eq!(request.argv, vec!["tool", "one"]);
        assert!(matches!(request.entry, Entry::Module(_)));
    }
}
