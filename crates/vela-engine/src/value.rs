//! Runtime values and per-module execution context.

use crate::ast::Stmt;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// A Vela runtime value.
#[derive(Clone)]
pub enum Value {
    /// The unit value, produced by statements and value-less returns.
    Unit,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Immutable string.
    Str(Rc<str>),
    /// Mutable array.
    Array(Rc<RefCell<Vec<Value>>>),
    /// User-defined function.
    Function(Rc<FunctionValue>),
    /// Host-implemented function.
    Native(Rc<NativeFunction>),
    /// Imported module.
    Module(Rc<ModuleValue>),
}

impl Value {
    /// Build a string value.
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Module(_) => "module",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                // Whole floats print without the fractional part
                if v.fract() == 0.0 && v.is_finite() && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Native(func) => write!(f, "<native fn {}>", func.name),
            Value::Module(module) => write!(f, "<module {}>", module.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Structural equality; numeric values compare across int/float.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Unit, Value::Unit) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => Rc::ptr_eq(x, y),
        (Value::Module(x), Value::Module(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// A user-defined function, closed over its defining module's globals.
pub struct FunctionValue {
    /// Declared name.
    pub name: String,
    /// Parameter names.
    pub params: Vec<String>,
    /// Body statements (shared with every call).
    pub body: Rc<Vec<Stmt>>,
    /// Module the function was declared in.
    pub module: Rc<ModuleContext>,
    /// Line of the declaration.
    pub def_line: u32,
}

/// Signature of a host-implemented module function.
pub type ExternalFn = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// A host-implemented function value.
pub struct NativeFunction {
    /// Name shown in messages and reports.
    pub name: String,
    /// Implementation.
    pub kind: NativeKind,
}

/// Native function implementations.
pub enum NativeKind {
    /// Engine builtin needing interpreter state (output sink, profiler).
    Builtin(Builtin),
    /// Plain host function over values.
    External(ExternalFn),
}

/// Engine builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `print(args...)`
    Print,
    /// `len(string | array)`
    Len,
    /// `str(value)`
    Str,
    /// `exit(code)`
    Exit,
    /// `profiler.shift_lines(offset)`
    ProfilerShiftLines,
    /// `profiler.report_lines()`
    ProfilerReportLines,
    /// `profiler.report_calls()`
    ProfilerReportCalls,
}

/// An imported module's binding namespace.
pub struct ModuleValue {
    /// Module name as imported.
    pub name: String,
    /// Exported bindings. For source modules this aliases the module's
    /// globals, so late definitions are visible to importers.
    pub exports: Rc<RefCell<FxHashMap<String, Value>>>,
}

/// Per-module execution context.
///
/// Holds the identity globals (`MODULE`, `FILE`, `ARGS`) and the source
/// lines so the profiler can key recorded metrics on line text.
pub struct ModuleContext {
    /// Run name: `"main"` for the entry module, the dotted import path
    /// otherwise.
    pub name: String,
    /// Display form of the source path.
    pub path: Rc<str>,
    /// Directory imports are resolved relative to.
    pub dir: PathBuf,
    /// Source split into lines.
    pub lines: Rc<Vec<String>>,
    /// Module-level bindings.
    pub globals: Rc<RefCell<FxHashMap<String, Value>>>,
}

impl ModuleContext {
    /// Text of a 1-based source line; empty if out of range.
    pub fn line_text(&self, line: u32) -> String {
        (line as usize)
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
