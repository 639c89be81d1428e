//! Transparent acceleration interception.
//!
//! [`install`] activates process-wide interception: from then on, imports
//! of the `tables` standard module are served by the accelerated backend
//! instead of the reference backend. The launcher calls it exactly once,
//! before any target code runs; the call is idempotent, and [`uninstall`]
//! exists so tests can deactivate interception deterministically.
//!
//! Both backends must agree on results; only `backend()` tells them apart.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use vela_engine::value::{ExternalFn, Value};
use vela_engine::NativeModule;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Activate interception. Idempotent; must be called before execution.
pub fn install() {
    INSTALLED.store(true, Ordering::SeqCst);
}

/// Deactivate interception (for tests).
pub fn uninstall() {
    INSTALLED.store(false, Ordering::SeqCst);
}

/// Whether interception is active.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Resolve a standard module name, honoring the interception state.
pub(crate) fn std_module(name: &str) -> Option<NativeModule> {
    match name {
        "tables" => Some(tables_module(is_installed())),
        _ => None,
    }
}

fn tables_module(accelerated: bool) -> NativeModule {
    let backend_name = if accelerated { "accelerated" } else { "reference" };

    let backend: ExternalFn = Rc::new(move |_args: &[Value]| Ok(Value::str(backend_name)));
    let sum: ExternalFn = if accelerated {
        Rc::new(|args: &[Value]| accelerated_sum(args))
    } else {
        Rc::new(|args: &[Value]| reference_sum(args))
    };
    let mean: ExternalFn = Rc::new(move |args: &[Value]| {
        let total = if accelerated {
            accelerated_sum(args)?
        } else {
            reference_sum(args)?
        };
        let count = match args {
            [Value::Array(items)] => items.borrow().len(),
            _ => 0,
        };
        if count == 0 {
            return Err("mean() of an empty array".to_string());
        }
        let total = match total {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
            _ => 0.0,
        };
        Ok(Value::Float(total / count as f64))
    });

    NativeModule {
        name: "tables".to_string(),
        functions: vec![
            ("backend".to_string(), backend),
            ("sum".to_string(), sum),
            ("mean".to_string(), mean),
        ],
    }
}

fn reference_sum(args: &[Value]) -> Result<Value, String> {
    let items = expect_numeric_array(args)?;
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut saw_float = false;
    for item in &items {
        match item {
            Value::Int(v) => int_total += v,
            Value::Float(v) => {
                saw_float = true;
                float_total += v;
            }
            _ => {}
        }
    }
    if saw_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

fn accelerated_sum(args: &[Value]) -> Result<Value, String> {
    let items = expect_numeric_array(args)?;
    let saw_float = items.iter().any(|v| matches!(v, Value::Float(_)));
    if saw_float {
        let total = items
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i as f64,
                Value::Float(f) => *f,
                _ => 0.0,
            })
            .sum::<f64>();
        Ok(Value::Float(total))
    } else {
        let total = items
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i,
                _ => 0,
            })
            .sum::<i64>();
        Ok(Value::Int(total))
    }
}

fn expect_numeric_array(args: &[Value]) -> Result<Vec<Value>, String> {
    match args {
        [Value::Array(items)] => {
            let items = items.borrow();
            for item in items.iter() {
                if !matches!(item, Value::Int(_) | Value::Float(_)) {
                    return Err(format!(
                        "expected an array of numbers, found {}",
                        item.type_name()
                    ));
                }
            }
            Ok(items.clone())
        }
        [other] => Err(format!("expected an array, got {}", other.type_name())),
        _ => Err(format!("expected 1 argument, got {}", args.len())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
