use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::runtime::function::Function;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Object>>;

/// A runtime value. Arrays and objects are shared containers: cloning the
/// `Value` aliases the same storage. Everything else is immutable.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<Function>),
    Object(ObjectRef),
    Array(ArrayRef),
    /// Opaque host value, e.g. a handle into the host's own data structures.
    Native(NativeHandle),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(obj: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn function(f: Function) -> Self {
        Value::Function(Rc::new(f))
    }

    pub fn native(label: impl Into<String>, data: impl Any) -> Self {
        Value::Native(NativeHandle::new(label, data))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Lowercase tag name, as reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null        => "null",
            Value::Bool(_)     => "boolean",
            Value::Number(_)   => "number",
            Value::Str(_)      => "string",
            Value::Function(_) => "function",
            Value::Object(_)   => "object",
            Value::Array(_)    => "array",
            Value::Native(_)   => "native",
        }
    }

    // ─── Coercions ───────────────────────────────────────────────────────────

    /// Falsy: null, `false`, `0` and `""`. NaN and empty containers are truthy.
    pub fn as_boolean(&self) -> bool {
        match self {
            Value::Null      => false,
            Value::Bool(b)   => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s)    => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b)   => if *b { 1.0 } else { 0.0 },
            Value::Str(s)    => parse_number(s),
            _ => f64::NAN,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Value::Null        => "null".into(),
            Value::Bool(b)     => b.to_string(),
            Value::Number(n)   => format_number(*n),
            Value::Str(s)      => s.to_string(),
            Value::Function(_) => "[Function]".into(),
            Value::Object(_)   => "[Object]".into(),
            Value::Array(_)    => "[Array]".into(),
            Value::Native(h)   => h.label().to_string(),
        }
    }

    // ─── Operators ───────────────────────────────────────────────────────────

    /// String concatenation when either side is a string, numeric addition otherwise.
    pub fn add(&self, other: &Value) -> Value {
        if matches!(self, Value::Str(_)) || matches!(other, Value::Str(_)) {
            let mut s = self.as_string();
            s.push_str(&other.as_string());
            return Value::from(s);
        }
        Value::Number(self.as_number() + other.as_number())
    }

    pub fn sub(&self, other: &Value) -> Value {
        Value::Number(self.as_number() - other.as_number())
    }

    pub fn mul(&self, other: &Value) -> Value {
        Value::Number(self.as_number() * other.as_number())
    }

    pub fn div(&self, other: &Value) -> Value {
        Value::Number(self.as_number() / other.as_number())
    }

    pub fn rem(&self, other: &Value) -> Value {
        Value::Number(self.as_number() % other.as_number())
    }

    /// Tag-strict equality: values of different tags are never equal.
    /// Numbers compare by value except that NaN equals NaN and `0` differs
    /// from `-0`. Containers compare structurally, functions and natives by
    /// identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        self.equals_within(other, &mut Vec::new())
    }

    /// `seen` holds the container pairs already under comparison further up.
    /// Meeting one of them again means both sides cycle the same way.
    fn equals_within(&self, other: &Value, seen: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null)             => true,
            (Value::Bool(a), Value::Bool(b))       => a == b,
            (Value::Number(a), Value::Number(b))   => same_number(*a, *b),
            (Value::Str(a), Value::Str(b))         => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b))   => a.same_handle(b),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) { return true; }
                nested_compare(seen, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast(), |seen| {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals_within(y, seen))
                })
            }
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) { return true; }
                nested_compare(seen, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast(), |seen| {
                    a.borrow().same_entries(&b.borrow(), seen)
                })
            }
            _ => false,
        }
    }

    /// Numeric ordering after `as_number`, whatever the tags. NaN sorts
    /// above every number and equal to itself, so the order is total.
    pub fn compare(&self, other: &Value) -> Ordering {
        let (a, b) = (self.as_number(), other.as_number());
        match (a.is_nan(), b.is_nan()) {
            (true, true)   => Ordering::Equal,
            (true, false)  => Ordering::Greater,
            (false, true)  => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(Rc::from(s)) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(Rc::from(s)) }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self { Value::array(items) }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self { Value::object(obj) }
}

fn same_number(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

fn nested_compare(
    seen: &mut Vec<(*const (), *const ())>,
    a: *const (),
    b: *const (),
    compare: impl FnOnce(&mut Vec<(*const (), *const ())>) -> bool,
) -> bool {
    if seen.contains(&(a, b)) {
        return true;
    }
    seen.push((a, b));
    let equal = stacker::maybe_grow(64 * 1024, 1024 * 1024, || compare(seen));
    seen.pop();
    equal
}

// ─── Number text ─────────────────────────────────────────────────────────────

/// Integral values that fit an `i64` print without a fraction. Other
/// magnitudes in `[1e-3, 1e7)` use the shortest plain decimal, and the rest
/// use scientific form with at least one fraction digit: `1.0E20`, `2.5E-7`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n.fract() == 0.0 && n.abs() < 9_223_372_036_854_775_808.0 {
        return (n as i64).to_string();
    }
    if (1e-3..1e7).contains(&n.abs()) {
        return n.to_string();
    }
    let text = format!("{n:e}");
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

/// Trimmed decimal parse; anything unparsable is NaN.
pub fn parse_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// String-keyed property map that iterates in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Object {
    keys: Vec<String>,
    entries: HashMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Overwriting a key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.entries.insert(key, value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.keys.iter().filter_map(|k| self.entries.get(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v)))
    }

    /// Same key set, and strictly equal values under each key.
    fn same_entries(&self, other: &Object, seen: &mut Vec<(*const (), *const ())>) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k).is_some_and(|w| v.equals_within(w, seen)))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut obj = Object::new();
        for (k, v) in iter {
            obj.set(k, v);
        }
        obj
    }
}

// ─── Native handle ───────────────────────────────────────────────────────────

/// A host value carried through scripts untouched. Scripts can pass it
/// around and compare it by identity; only host natives can look inside.
#[derive(Clone)]
pub struct NativeHandle {
    label: String,
    data: Rc<dyn Any>,
}

impl NativeHandle {
    pub fn new(label: impl Into<String>, data: impl Any) -> Self {
        Self { label: label.into(), data: Rc::new(data) }
    }

    /// The text a script sees when it stringifies the handle.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    fn same_handle(&self, other: &NativeHandle) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({})", self.label)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
