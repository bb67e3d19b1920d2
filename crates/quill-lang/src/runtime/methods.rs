//! Built-in methods on strings and arrays.
//!
//! Member access on a string or array consults this registry: `length` is a
//! field, everything else is a method looked up by name. Unknown names fall
//! through to null in the interpreter.
//!
//! Adding a method = registering one descriptor here.

use std::collections::HashMap;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::{ArrayRef, Value};

// ─── Function pointer aliases ─────────────────────────────────────────────────

/// A string method. Receives the receiver text and pre-evaluated args.
pub type StrMethod = fn(&str, &[Value]) -> Result<Value, RuntimeError>;

/// An array method. Receives the shared receiver; may call back into scripts.
pub type ArrayMethod = fn(&mut Interpreter, &ArrayRef, &[Value]) -> Result<Value, RuntimeError>;

#[derive(Clone, Copy)]
pub enum Method {
    Str(StrMethod),
    Array(ArrayMethod),
}

impl Method {
    /// Invoke against `recv`. A receiver of the wrong kind yields null.
    pub fn call(self, interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match (self, recv) {
            (Method::Str(f), Value::Str(s)) => f(s, args),
            (Method::Array(f), Value::Array(items)) => f(interp, items, args),
            _ => Ok(Value::Null),
        }
    }
}

// ─── Descriptors ──────────────────────────────────────────────────────────────

pub struct StrMethodDesc {
    pub name: &'static str,
    pub call: StrMethod,
}

pub struct ArrayMethodDesc {
    pub name: &'static str,
    pub call: ArrayMethod,
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct MethodRegistry {
    strings: HashMap<&'static str, StrMethod>,
    arrays: HashMap<&'static str, ArrayMethod>,
}

impl MethodRegistry {
    /// An empty registry; `default()` carries the standard methods.
    pub fn new() -> Self {
        Self { strings: HashMap::new(), arrays: HashMap::new() }
    }

    pub fn register_string(&mut self, desc: StrMethodDesc) {
        self.strings.insert(desc.name, desc.call);
    }

    pub fn register_array(&mut self, desc: ArrayMethodDesc) {
        self.arrays.insert(desc.name, desc.call);
    }

    /// Read-only fields. Strings and arrays only expose `length`.
    pub fn field(&self, recv: &Value, name: &str) -> Option<Value> {
        if name != "length" {
            return None;
        }
        match recv {
            Value::Str(s) => Some(Value::Number(s.chars().count() as f64)),
            Value::Array(items) => Some(Value::Number(items.borrow().len() as f64)),
            _ => None,
        }
    }

    pub fn lookup(&self, recv: &Value, name: &str) -> Option<Method> {
        match recv {
            Value::Str(_) => self.strings.get(name).copied().map(Method::Str),
            Value::Array(_) => self.arrays.get(name).copied().map(Method::Array),
            _ => None,
        }
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        let mut r = Self::new();
        for desc in string_methods() {
            r.register_string(desc);
        }
        for desc in array_methods() {
            r.register_array(desc);
        }
        r
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Null)
}

fn arg_string(args: &[Value], i: usize) -> String {
    arg(args, i).as_string()
}

/// Integer view of a number the way index arguments are read: truncated
/// toward zero, NaN as 0.
fn to_int(v: &Value) -> i64 {
    v.as_number() as i64
}

/// Callback argument, or a `CallbackRequired` failure naming `method`.
fn callback(args: &[Value], method: &'static str) -> Result<Value, RuntimeError> {
    match args.first() {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        _ => Err(RuntimeError::new(0, RuntimeErrorKind::CallbackRequired { method })),
    }
}

/// Element `i` of a live array. Re-reading per step lets callbacks mutate
/// the array without holding a borrow across the call.
fn element(items: &ArrayRef, i: usize) -> Option<Value> {
    items.borrow().get(i).cloned()
}

/// Run `f` for each `(element, index)` until it returns `Some`.
fn each_with_callback<T>(
    interp: &mut Interpreter,
    items: &ArrayRef,
    cb: &Value,
    mut f: impl FnMut(Value, usize, Value) -> Option<T>,
) -> Result<Option<T>, RuntimeError> {
    let receiver = Value::Array(items.clone());
    let mut i = 0;
    while let Some(el) = element(items, i) {
        let result = interp.call_function(cb, &[el.clone(), Value::Number(i as f64), receiver.clone()])?;
        if let Some(out) = f(el, i, result) {
            return Ok(Some(out));
        }
        i += 1;
    }
    Ok(None)
}

fn char_index_of(haystack: &str, needle: &str) -> Option<usize> {
    haystack.find(needle).map(|byte| haystack[..byte].chars().count())
}

// ─── string ───────────────────────────────────────────────────────────────────

fn string_methods() -> Vec<StrMethodDesc> {
    vec![
        StrMethodDesc { name: "toLowerCase", call: |s, _| Ok(Value::from(s.to_lowercase())) },
        StrMethodDesc { name: "toUpperCase", call: |s, _| Ok(Value::from(s.to_uppercase())) },
        StrMethodDesc { name: "trim",        call: |s, _| Ok(Value::from(s.trim())) },
        StrMethodDesc {
            name: "startsWith",
            call: |s, args| Ok(Value::Bool(s.starts_with(arg_string(args, 0).as_str()))),
        },
        StrMethodDesc {
            name: "endsWith",
            call: |s, args| Ok(Value::Bool(s.ends_with(arg_string(args, 0).as_str()))),
        },
        StrMethodDesc {
            name: "includes",
            call: |s, args| Ok(Value::Bool(s.contains(arg_string(args, 0).as_str()))),
        },
        StrMethodDesc {
            name: "contains",
            call: |s, args| Ok(Value::Bool(s.contains(arg_string(args, 0).as_str()))),
        },
        StrMethodDesc {
            // Character index of the first occurrence, or -1.
            name: "indexOf",
            call: |s, args| {
                let idx = char_index_of(s, &arg_string(args, 0)).map_or(-1.0, |i| i as f64);
                Ok(Value::Number(idx))
            },
        },
        StrMethodDesc {
            // Bounds clamp to the string; reversed bounds are swapped.
            name: "substring",
            call: |s, args| {
                let len = s.chars().count() as i64;
                let start = to_int(&arg(args, 0)).clamp(0, len);
                let end = match args.get(1) {
                    None | Some(Value::Null) => len,
                    Some(v) => to_int(v).clamp(0, len),
                };
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                let out: String = s.chars().skip(lo as usize).take((hi - lo) as usize).collect();
                Ok(Value::from(out))
            },
        },
        StrMethodDesc {
            // Literal search, every occurrence replaced.
            name: "replace",
            call: |s, args| Ok(Value::from(s.replace(&arg_string(args, 0), &arg_string(args, 1)))),
        },
        StrMethodDesc {
            name: "split",
            call: |s, args| {
                let parts = split_literal(s, &arg_string(args, 0));
                Ok(Value::array(parts.into_iter().map(Value::from).collect()))
            },
        },
    ]
}

/// Literal split. No match (or an empty input) yields the input itself,
/// trailing empty parts are dropped, and an empty separator splits into
/// characters.
fn split_literal(s: &str, sep: &str) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    if !s.contains(sep) {
        return vec![s.to_string()];
    }
    let mut parts: Vec<String> = s.split(sep).map(String::from).collect();
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    parts
}

// ─── array ────────────────────────────────────────────────────────────────────

fn array_methods() -> Vec<ArrayMethodDesc> {
    vec![
        ArrayMethodDesc {
            // Appends every argument; returns the new length.
            name: "push",
            call: |_, items, args| {
                let mut items = items.borrow_mut();
                items.extend(args.iter().cloned());
                Ok(Value::Number(items.len() as f64))
            },
        },
        ArrayMethodDesc {
            name: "pop",
            call: |_, items, _| Ok(items.borrow_mut().pop().unwrap_or(Value::Null)),
        },
        ArrayMethodDesc {
            name: "shift",
            call: |_, items, _| {
                let mut items = items.borrow_mut();
                if items.is_empty() { Ok(Value::Null) } else { Ok(items.remove(0)) }
            },
        },
        ArrayMethodDesc {
            // Prepends the arguments in order; returns the new length.
            name: "unshift",
            call: |_, items, args| {
                let mut items = items.borrow_mut();
                items.splice(0..0, args.iter().cloned());
                Ok(Value::Number(items.len() as f64))
            },
        },
        ArrayMethodDesc {
            // In place; returns the same array.
            name: "reverse",
            call: |_, items, _| {
                items.borrow_mut().reverse();
                Ok(Value::Array(items.clone()))
            },
        },
        ArrayMethodDesc {
            name: "indexOf",
            call: |_, items, args| {
                let target = arg(args, 0);
                let idx = items.borrow().iter().position(|v| v.strict_equals(&target));
                Ok(Value::Number(idx.map_or(-1.0, |i| i as f64)))
            },
        },
        ArrayMethodDesc {
            name: "includes",
            call: |_, items, args| {
                let target = arg(args, 0);
                Ok(Value::Bool(items.borrow().iter().any(|v| v.strict_equals(&target))))
            },
        },
        ArrayMethodDesc {
            // Negative bounds count from the end.
            name: "slice",
            call: |_, items, args| {
                let items = items.borrow();
                let len = items.len() as i64;
                let resolve = |v: i64| if v < 0 { (len + v).max(0) } else { v.min(len) };
                let start = resolve(to_int(&arg(args, 0)));
                let end = match args.get(1) {
                    None | Some(Value::Null) => len,
                    Some(v) => resolve(to_int(v)),
                };
                let out = if start < end { items[start as usize..end as usize].to_vec() } else { Vec::new() };
                Ok(Value::array(out))
            },
        },
        ArrayMethodDesc {
            // Array arguments are spliced in one level deep.
            name: "concat",
            call: |_, items, args| {
                let mut out = items.borrow().clone();
                for a in args {
                    match a {
                        Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Ok(Value::array(out))
            },
        },
        ArrayMethodDesc {
            name: "join",
            call: |_, items, args| {
                let sep = match args.first() {
                    None | Some(Value::Null) => ",".to_string(),
                    Some(v) => v.as_string(),
                };
                let parts: Vec<String> = items.borrow().iter().map(Value::as_string).collect();
                Ok(Value::from(parts.join(&sep)))
            },
        },
        ArrayMethodDesc {
            name: "flat",
            call: |_, items, args| {
                let depth = match args.first() {
                    None | Some(Value::Null) => 1,
                    Some(v) => to_int(v),
                };
                Ok(Value::array(flatten(&items.borrow(), depth)))
            },
        },
        ArrayMethodDesc {
            name: "flatMap",
            call: |interp, items, args| {
                let cb = callback(args, "flatMap")?;
                let mut out = Vec::new();
                each_with_callback(interp, items, &cb, |_, _, mapped| {
                    if let Value::Array(inner) = &mapped {
                        out.extend(inner.borrow().iter().cloned());
                    } else {
                        out.push(mapped);
                    }
                    None::<()>
                })?;
                Ok(Value::array(out))
            },
        },
        ArrayMethodDesc {
            name: "forEach",
            call: |interp, items, args| {
                let cb = callback(args, "forEach")?;
                each_with_callback(interp, items, &cb, |_, _, _| None::<()>)?;
                Ok(Value::Null)
            },
        },
        ArrayMethodDesc {
            name: "map",
            call: |interp, items, args| {
                let cb = callback(args, "map")?;
                let mut out = Vec::new();
                each_with_callback(interp, items, &cb, |_, _, mapped| {
                    out.push(mapped);
                    None::<()>
                })?;
                Ok(Value::array(out))
            },
        },
        ArrayMethodDesc {
            name: "filter",
            call: |interp, items, args| {
                let cb = callback(args, "filter")?;
                let mut out = Vec::new();
                each_with_callback(interp, items, &cb, |el, _, keep| {
                    if keep.as_boolean() { out.push(el); }
                    None::<()>
                })?;
                Ok(Value::array(out))
            },
        },
        ArrayMethodDesc {
            name: "find",
            call: |interp, items, args| {
                let cb = callback(args, "find")?;
                let found = each_with_callback(interp, items, &cb, |el, _, hit| hit.as_boolean().then_some(el))?;
                Ok(found.unwrap_or(Value::Null))
            },
        },
        ArrayMethodDesc {
            name: "findIndex",
            call: |interp, items, args| {
                let cb = callback(args, "findIndex")?;
                let found = each_with_callback(interp, items, &cb, |_, i, hit| hit.as_boolean().then_some(i))?;
                Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
            },
        },
        ArrayMethodDesc {
            name: "some",
            call: |interp, items, args| {
                let cb = callback(args, "some")?;
                let found = each_with_callback(interp, items, &cb, |_, _, hit| hit.as_boolean().then_some(()))?;
                Ok(Value::Bool(found.is_some()))
            },
        },
        ArrayMethodDesc {
            name: "every",
            call: |interp, items, args| {
                let cb = callback(args, "every")?;
                let failed = each_with_callback(interp, items, &cb, |_, _, ok| (!ok.as_boolean()).then_some(()))?;
                Ok(Value::Bool(failed.is_none()))
            },
        },
        ArrayMethodDesc {
            // A null initial value counts as absent.
            name: "reduce",
            call: |interp, items, args| {
                let cb = callback(args, "reduce")?;
                let receiver = Value::Array(items.clone());
                let (mut acc, mut i) = match args.get(1) {
                    Some(init) if !init.is_null() => (init.clone(), 0),
                    _ => match element(items, 0) {
                        Some(first) => (first, 1),
                        None => return Err(RuntimeError::new(0, RuntimeErrorKind::EmptyReduce)),
                    },
                };
                while let Some(el) = element(items, i) {
                    acc = interp.call_function(&cb, &[acc, el, Value::Number(i as f64), receiver.clone()])?;
                    i += 1;
                }
                Ok(acc)
            },
        },
    ]
}

fn flatten(items: &[Value], depth: i64) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => out.extend(flatten(&inner.borrow(), depth - 1)),
            other => out.push(other.clone()),
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
