//! Tree-walking interpreter for Vela.
//!
//! Executes a parsed module with the implicit globals `MODULE` (run name),
//! `FILE` (source path), and `ARGS` (argument vector). The entry module
//! runs under the run name [`MAIN_RUN_NAME`], which is what
//! `if MODULE == "main"` guards test for; imported modules run under their
//! dotted import path.
//!
//! Imports resolve through a [`ModuleResolver`] supplied by the embedding
//! runtime. The built-in `profiler` module is the exception: it binds
//! directly to the engine's profiling facility. While a session is open,
//! statement and call boundaries are timed and recorded against
//! `(line, file, text)` and `(name, file)` keys.

use crate::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::error::EngineError;
use crate::output::OutputSink;
use crate::parser::Parser;
use crate::profiler::{report, Profiler};
use crate::value::{
    values_equal, Builtin, FunctionValue, ModuleContext, ModuleValue, NativeFunction, NativeKind,
    Value,
};
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Run name that marks a module as the directly invoked entry point.
pub const MAIN_RUN_NAME: &str = "main";

/// Recursion limit for user function calls.
const MAX_CALL_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Module resolution
// ---------------------------------------------------------------------------

/// A module produced by the resolver.
pub enum ResolvedModule {
    /// A source file to parse and execute.
    Source {
        /// Path the module was found at.
        path: PathBuf,
        /// Full source text.
        source: String,
    },
    /// A host-implemented module.
    Native(NativeModule),
}

/// Functions exported by a host-implemented module.
#[derive(Clone)]
pub struct NativeModule {
    /// Module name.
    pub name: String,
    /// Exported functions.
    pub functions: Vec<(String, crate::value::ExternalFn)>,
}

/// Module resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate file exists for the name.
    #[error("cannot find module '{name}'. Searched:\n{searched}")]
    NotFound {
        /// Dotted module name.
        name: String,
        /// Newline-separated list of candidate paths.
        searched: String,
    },

    /// A candidate file exists but could not be read.
    #[error("failed to read module '{path}': {source}")]
    Read {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Resolves dotted module names to modules.
///
/// `importer_dir` is the directory of the importing file, so relative
/// imports behave the same under direct invocation and under the launcher.
pub trait ModuleResolver {
    /// Resolve `name` on behalf of a file in `importer_dir`.
    fn resolve(&self, name: &str, importer_dir: &Path) -> Result<ResolvedModule, ResolveError>;
}

// ---------------------------------------------------------------------------
// Scopes and control flow
// ---------------------------------------------------------------------------

/// Result of executing a statement.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Name lookup scope: optional function locals over module globals.
struct Scope {
    module: Rc<ModuleContext>,
    locals: Option<FxHashMap<String, Value>>,
}

impl Scope {
    fn module_scope(module: Rc<ModuleContext>) -> Self {
        Self {
            module,
            locals: None,
        }
    }

    fn function_scope(module: Rc<ModuleContext>, locals: FxHashMap<String, Value>) -> Self {
        Self {
            module,
            locals: Some(locals),
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(locals) = &self.locals {
            if let Some(value) = locals.get(name) {
                return Some(value.clone());
            }
        }
        self.module.globals.borrow().get(name).cloned()
    }

    fn define(&mut self, name: String, value: Value) {
        match &mut self.locals {
            Some(locals) => {
                locals.insert(name, value);
            }
            None => {
                self.module.globals.borrow_mut().insert(name, value);
            }
        }
    }

    fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(locals) = &mut self.locals {
            if locals.contains_key(name) {
                locals.insert(name.to_string(), value);
                return true;
            }
        }
        let mut globals = self.module.globals.borrow_mut();
        if globals.contains_key(name) {
            globals.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }
}

static BUILTINS: Lazy<FxHashMap<&'static str, Builtin>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("print", Builtin::Print);
    map.insert("len", Builtin::Len);
    map.insert("str", Builtin::Str);
    map.insert("exit", Builtin::Exit);
    map
});

fn builtin_value(name: &str) -> Option<Value> {
    BUILTINS.get(name).map(|builtin| {
        Value::Native(Rc::new(NativeFunction {
            name: name.to_string(),
            kind: NativeKind::Builtin(*builtin),
        }))
    })
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// The Vela interpreter.
///
/// One interpreter executes one entry module (plus whatever it imports);
/// create a fresh one per run.
pub struct Interpreter {
    resolver: Rc<dyn ModuleResolver>,
    profiler: Arc<Profiler>,
    out: OutputSink,
    argv: Vec<String>,
    /// Imported source modules, keyed by canonical path.
    modules: FxHashMap<PathBuf, Rc<ModuleValue>>,
    /// Paths currently executing their top level (cycle detection).
    loading: FxHashSet<PathBuf>,
    /// Lazily built `profiler` module.
    profiler_mod: Option<Rc<ModuleValue>>,
    depth: usize,
}

impl Interpreter {
    /// Create an interpreter.
    pub fn new(resolver: Rc<dyn ModuleResolver>, profiler: Arc<Profiler>, out: OutputSink) -> Self {
        Self {
            resolver,
            profiler,
            out,
            argv: Vec::new(),
            modules: FxHashMap::default(),
            loading: FxHashSet::default(),
            profiler_mod: None,
            depth: 0,
        }
    }

    /// The profiler this interpreter records into.
    pub fn profiler(&self) -> &Arc<Profiler> {
        &self.profiler
    }

    /// Run `source` at `path` as the main program.
    ///
    /// `run_name` becomes the module's `MODULE` global (the launcher passes
    /// [`MAIN_RUN_NAME`]); `argv` becomes its `ARGS` global and is shared
    /// with every module imported during the run.
    pub fn run_main(
        &mut self,
        source: &str,
        path: &Path,
        run_name: &str,
        argv: &[String],
    ) -> Result<(), EngineError> {
        self.argv = argv.to_vec();
        let program = self.parse(source, path)?;
        let ctx = self.new_module_context(run_name, path, source);
        self.exec_program(&program, &ctx)
    }

    fn parse(&self, source: &str, path: &Path) -> Result<Program, EngineError> {
        let file = path.display().to_string();
        let parser = Parser::new(source).map_err(|error| EngineError::Lex {
            file: file.clone(),
            error,
        })?;
        parser
            .parse()
            .map_err(|error| EngineError::Parse { file, error })
    }

    fn new_module_context(&self, name: &str, path: &Path, source: &str) -> Rc<ModuleContext> {
        let path_str: Rc<str> = Rc::from(path.display().to_string());
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let lines: Rc<Vec<String>> = Rc::new(source.lines().map(String::from).collect());

        let mut globals = FxHashMap::default();
        globals.insert("MODULE".to_string(), Value::str(name));
        globals.insert("FILE".to_string(), Value::Str(path_str.clone()));
        let args: Vec<Value> = self.argv.iter().map(|a| Value::str(a)).collect();
        globals.insert(
            "ARGS".to_string(),
            Value::Array(Rc::new(RefCell::new(args))),
        );

        Rc::new(ModuleContext {
            name: name.to_string(),
            path: path_str,
            dir,
            lines,
            globals: Rc::new(RefCell::new(globals)),
        })
    }

    // ── Statement execution ──────────────────────────────────────────

    fn exec_program(
        &mut self,
        program: &Program,
        ctx: &Rc<ModuleContext>,
    ) -> Result<(), EngineError> {
        let mut scope = Scope::module_scope(ctx.clone());
        for stmt in &program.statements {
            match self.exec_stmt(stmt, &mut scope)? {
                Flow::Normal => {}
                Flow::Return(_) => {
                    return Err(self.runtime_err(&scope, stmt.line, "'return' outside a function"))
                }
                Flow::Break | Flow::Continue => {
                    return Err(self.runtime_err(
                        &scope,
                        stmt.line,
                        "'break' or 'continue' outside a loop",
                    ))
                }
            }
        }
        Ok(())
    }

    fn exec_block(&mut self, body: &[Stmt], scope: &mut Scope) -> Result<Flow, EngineError> {
        for stmt in body {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Execute a statement, timing it when a profiling session is open.
    fn exec_stmt(&mut self, stmt: &Stmt, scope: &mut Scope) -> Result<Flow, EngineError> {
        if !self.profiler.is_active() {
            return self.exec_stmt_inner(stmt, scope);
        }
        let started = Instant::now();
        let result = self.exec_stmt_inner(stmt, scope);
        self.profiler.record_line(
            &scope.module.path,
            stmt.line,
            &scope.module.line_text(stmt.line),
            started.elapsed(),
        );
        result
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, scope: &mut Scope) -> Result<Flow, EngineError> {
        match &stmt.kind {
            StmtKind::Import { path } => {
                let value = self.import_module(path, scope, stmt.line)?;
                let bind = path.rsplit('.').next().unwrap_or(path).to_string();
                scope.define(bind, value);
                Ok(Flow::Normal)
            }
            StmtKind::Function { name, params, body } => {
                let function = FunctionValue {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    module: scope.module.clone(),
                    def_line: stmt.line,
                };
                scope.define(name.clone(), Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }
            StmtKind::Let { name, value } => {
                let value = self.eval_expr(value, scope)?;
                scope.define(name.clone(), value);
                Ok(Flow::Normal)
            }
            StmtKind::Assign { name, value } => {
                let value = self.eval_expr(value, scope)?;
                if scope.assign(name, value) {
                    Ok(Flow::Normal)
                } else {
                    Err(self.runtime_err(
                        scope,
                        stmt.line,
                        format!("assignment to undefined variable '{}'", name),
                    ))
                }
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => match self.eval_expr(cond, scope)? {
                Value::Bool(true) => self.exec_block(then_body, scope),
                Value::Bool(false) => match else_body {
                    Some(body) => self.exec_block(body, scope),
                    None => Ok(Flow::Normal),
                },
                other => Err(self.runtime_err(
                    scope,
                    cond.line,
                    format!("'if' condition must be a boolean, got {}", other.type_name()),
                )),
            },
            StmtKind::While { cond, body } => loop {
                match self.eval_expr(cond, scope)? {
                    Value::Bool(true) => {}
                    Value::Bool(false) => return Ok(Flow::Normal),
                    other => {
                        return Err(self.runtime_err(
                            scope,
                            cond.line,
                            format!(
                                "'while' condition must be a boolean, got {}",
                                other.type_name()
                            ),
                        ))
                    }
                }
                match self.exec_block(body, scope)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => return Ok(Flow::Normal),
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            },
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Profile { body } => {
                // Scoped acquisition: the guard closes the session on every
                // exit path, so partial results survive errors in the body.
                let session = self.profiler.begin_session()?;
                let result = self.exec_block(body, scope);
                drop(session);
                result
            }
            StmtKind::Expr { expr } => {
                self.eval_expr(expr, scope)?;
                Ok(Flow::Normal)
            }
        }
    }

    // ── Expression evaluation ────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, EngineError> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(value) => Ok(Value::str(value)),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Ident(name) => scope
                .lookup(name)
                .or_else(|| builtin_value(name))
                .ok_or_else(|| {
                    self.runtime_err(scope, expr.line, format!("undefined variable '{}'", name))
                }),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scope)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(v)) => v
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| self.runtime_err(scope, expr.line, "integer overflow")),
                    (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
                    (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
                    (_, other) => Err(self.runtime_err(
                        scope,
                        expr.line,
                        format!("unary operator does not support {}", other.type_name()),
                    )),
                }
            }
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And | BinaryOp::Or => self.eval_logical(*op, left, right, scope),
                _ => {
                    let lhs = self.eval_expr(left, scope)?;
                    let rhs = self.eval_expr(right, scope)?;
                    binary_values(*op, &lhs, &rhs)
                        .map_err(|message| self.runtime_err(scope, expr.line, message))
                }
            },
            ExprKind::Call { callee, args } => {
                let callee_value = self.eval_expr(callee, scope)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, scope)?);
                }
                let module = scope.module.clone();
                self.call_value(callee_value, arg_values, &module, expr.line)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object, scope)?;
                let index_value = self.eval_expr(index, scope)?;
                match (&object, &index_value) {
                    (Value::Array(items), Value::Int(i)) => {
                        let items = items.borrow();
                        usize::try_from(*i)
                            .ok()
                            .and_then(|i| items.get(i))
                            .cloned()
                            .ok_or_else(|| {
                                self.runtime_err(
                                    scope,
                                    expr.line,
                                    format!(
                                        "index {} out of bounds for array of length {}",
                                        i,
                                        items.len()
                                    ),
                                )
                            })
                    }
                    _ => Err(self.runtime_err(
                        scope,
                        expr.line,
                        format!(
                            "cannot index {} with {}",
                            object.type_name(),
                            index_value.type_name()
                        ),
                    )),
                }
            }
            ExprKind::Member { object, field } => {
                let object = self.eval_expr(object, scope)?;
                match object {
                    Value::Module(module) => {
                        module.exports.borrow().get(field).cloned().ok_or_else(|| {
                            self.runtime_err(
                                scope,
                                expr.line,
                                format!("module '{}' has no member '{}'", module.name, field),
                            )
                        })
                    }
                    other => Err(self.runtime_err(
                        scope,
                        expr.line,
                        format!("{} values have no members", other.type_name()),
                    )),
                }
            }
        }
    }

    fn eval_logical(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        scope: &Scope,
    ) -> Result<Value, EngineError> {
        let expect_bool = |this: &Self, value: Value, expr: &Expr| match value {
            Value::Bool(b) => Ok(b),
            other => Err(this.runtime_err(
                scope,
                expr.line,
                format!(
                    "logical operators need boolean operands, got {}",
                    other.type_name()
                ),
            )),
        };

        let lhs = self.eval_expr(left, scope)?;
        let lhs = expect_bool(self, lhs, left)?;
        let short_circuit = match op {
            BinaryOp::And => !lhs,
            _ => lhs,
        };
        if short_circuit {
            return Ok(Value::Bool(lhs));
        }
        let rhs = self.eval_expr(right, scope)?;
        let rhs = expect_bool(self, rhs, right)?;
        Ok(Value::Bool(rhs))
    }

    // ── Calls ────────────────────────────────────────────────────────

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        module: &Rc<ModuleContext>,
        line: u32,
    ) -> Result<Value, EngineError> {
        match callee {
            Value::Function(function) => self.call_function(&function, args, module, line),
            Value::Native(native) => match &native.kind {
                NativeKind::Builtin(builtin) => self.call_builtin(*builtin, &args, module, line),
                NativeKind::External(function) => function(&args)
                    .map_err(|message| EngineError::runtime_at(message, &module.path, line)),
            },
            other => Err(EngineError::runtime_at(
                format!("{} values are not callable", other.type_name()),
                &module.path,
                line,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
        caller: &Rc<ModuleContext>,
        line: u32,
    ) -> Result<Value, EngineError> {
        if args.len() != function.params.len() {
            return Err(EngineError::runtime_at(
                format!(
                    "function '{}' expects {} arguments, got {}",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
                &caller.path,
                line,
            ));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EngineError::runtime_at(
                format!("maximum call depth exceeded calling '{}'", function.name),
                &caller.path,
                line,
            ));
        }

        let started = self.profiler.is_active().then(Instant::now);

        let mut locals = FxHashMap::default();
        for (param, arg) in function.params.iter().zip(args) {
            locals.insert(param.clone(), arg);
        }
        let mut scope = Scope::function_scope(function.module.clone(), locals);
        let body = Rc::clone(&function.body);

        self.depth += 1;
        let flow = self.exec_block(&body, &mut scope);
        self.depth -= 1;

        if let Some(t0) = started {
            self.profiler
                .record_call(&function.name, &function.module.path, t0.elapsed());
        }

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Unit),
            Flow::Break | Flow::Continue => Err(EngineError::runtime_at(
                "'break' or 'continue' outside a loop",
                &function.module.path,
                function.def_line,
            )),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Value],
        module: &Rc<ModuleContext>,
        line: u32,
    ) -> Result<Value, EngineError> {
        let err =
            |message: String| EngineError::runtime_at(message, &module.path, line);

        match builtin {
            Builtin::Print => {
                let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                self.out.write_str(&rendered.join(" "));
                self.out.write_str("\n");
                Ok(Value::Unit)
            }
            Builtin::Len => match args {
                [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
                [Value::Array(items)] => Ok(Value::Int(items.borrow().len() as i64)),
                [other] => Err(err(format!("len() does not support {}", other.type_name()))),
                _ => Err(err(format!("len() expects 1 argument, got {}", args.len()))),
            },
            Builtin::Str => match args {
                [value] => Ok(Value::str(&value.to_string())),
                _ => Err(err(format!("str() expects 1 argument, got {}", args.len()))),
            },
            Builtin::Exit => match args {
                [] => Err(EngineError::Exit(0)),
                [Value::Int(code)] => Err(EngineError::Exit(*code as i32)),
                [other] => Err(err(format!(
                    "exit() expects an integer status, got {}",
                    other.type_name()
                ))),
                _ => Err(err(format!(
                    "exit() expects at most 1 argument, got {}",
                    args.len()
                ))),
            },
            Builtin::ProfilerShiftLines => match args {
                [Value::Int(offset)] if *offset >= 0 => {
                    if self.profiler.shift_finished_lines(*offset as u32, &module.path) {
                        Ok(Value::Unit)
                    } else {
                        Err(err("no finished profiling session to translate".to_string()))
                    }
                }
                _ => Err(err(
                    "shift_lines() expects a non-negative integer offset".to_string(),
                )),
            },
            Builtin::ProfilerReportLines => {
                let profile = self
                    .profiler
                    .finished()
                    .ok_or_else(|| err("no finished profiling session to report".to_string()))?;
                self.out.write_str(&report::render_line_report(&profile));
                Ok(Value::Unit)
            }
            Builtin::ProfilerReportCalls => {
                let profile = self
                    .profiler
                    .finished()
                    .ok_or_else(|| err("no finished profiling session to report".to_string()))?;
                self.out.write_str(&report::render_call_report(&profile));
                Ok(Value::Unit)
            }
        }
    }

    // ── Imports ──────────────────────────────────────────────────────

    fn import_module(
        &mut self,
        name: &str,
        scope: &Scope,
        line: u32,
    ) -> Result<Value, EngineError> {
        // Built-in modules shadow files of the same name.
        if name == "profiler" {
            let module = self.profiler_module();
            return Ok(Value::Module(module));
        }

        let resolver = Rc::clone(&self.resolver);
        match resolver.resolve(name, &scope.module.dir)? {
            ResolvedModule::Native(native) => {
                let mut exports = FxHashMap::default();
                for (fn_name, function) in native.functions {
                    exports.insert(
                        fn_name.clone(),
                        Value::Native(Rc::new(NativeFunction {
                            name: fn_name,
                            kind: NativeKind::External(function),
                        })),
                    );
                }
                Ok(Value::Module(Rc::new(ModuleValue {
                    name: native.name,
                    exports: Rc::new(RefCell::new(exports)),
                })))
            }
            ResolvedModule::Source { path, source } => {
                let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                if let Some(cached) = self.modules.get(&key) {
                    return Ok(Value::Module(cached.clone()));
                }
                if self.loading.contains(&key) {
                    return Err(self.runtime_err(
                        scope,
                        line,
                        format!("circular import of module '{}'", name),
                    ));
                }

                let program = self.parse(&source, &path)?;
                let ctx = self.new_module_context(name, &path, &source);

                self.loading.insert(key.clone());
                let run = self.exec_program(&program, &ctx);
                self.loading.remove(&key);
                run?;

                let module = Rc::new(ModuleValue {
                    name: name.to_string(),
                    exports: ctx.globals.clone(),
                });
                self.modules.insert(key, module.clone());
                Ok(Value::Module(module))
            }
        }
    }

    /// The built-in `profiler` module: remap and report operations bound to
    /// this interpreter's profiling facility.
    fn profiler_module(&mut self) -> Rc<ModuleValue> {
        if let Some(module) = &self.profiler_mod {
            return module.clone();
        }
        let mut exports = FxHashMap::default();
        for (name, builtin) in [
            ("shift_lines", Builtin::ProfilerShiftLines),
            ("report_lines", Builtin::ProfilerReportLines),
            ("report_calls", Builtin::ProfilerReportCalls),
        ] {
            exports.insert(
                name.to_string(),
                Value::Native(Rc::new(NativeFunction {
                    name: name.to_string(),
                    kind: NativeKind::Builtin(builtin),
                })),
            );
        }
        let module = Rc::new(ModuleValue {
            name: "profiler".to_string(),
            exports: Rc::new(RefCell::new(exports)),
        });
        self.profiler_mod = Some(module.clone());
        module
    }

    fn runtime_err(&self, scope: &Scope, line: u32, message: impl Into<String>) -> EngineError {
        EngineError::runtime_at(message, &scope.module.path, line)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn binary_values(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            (Value::Str(a), Value::Str(b)) => Ok(Value::str(&format!("{}{}", a, b))),
            _ => numeric_op(left, right, "+", |a, b| a + b),
        },
        BinaryOp::Sub => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => numeric_op(left, right, "-", |a, b| a - b),
        },
        BinaryOp::Mul => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => numeric_op(left, right, "*", |a, b| a * b),
        },
        BinaryOp::Div => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err("division by zero".to_string()),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a / b)),
            _ => numeric_op(left, right, "/", |a, b| a / b),
        },
        BinaryOp::Rem => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err("division by zero".to_string()),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
            _ => Err(format!(
                "'%' needs integer operands, got {} and {}",
                left.type_name(),
                right.type_name()
            )),
        },
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt => compare_values(left, right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => compare_values(left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare_values(left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare_values(left, right).map(|o| Value::Bool(o != Ordering::Less)),
        // Short-circuit operators are evaluated in `eval_logical`.
        BinaryOp::And | BinaryOp::Or => Err("logical operator applied out of order".to_string()),
    }
}

fn numeric_op(
    left: &Value,
    right: &Value,
    symbol: &str,
    apply: impl Fn(f64, f64) -> f64,
) -> Result<Value, String> {
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(apply(a, b))),
        _ => Err(format!(
            "'{}' does not support {} and {}",
            symbol,
            left.type_name(),
            right.type_name()
        )),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

fn compare_values(left: &Value, right: &Value) -> Result<Ordering, String> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                "cannot order incomparable numbers".to_string()
            }),
            _ => Err(format!(
                "cannot compare {} and {}",
                left.type_name(),
                right.type_name()
            )),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
