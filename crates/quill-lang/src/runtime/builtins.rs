//! Always-available globals. No import required.
//! Includes: script logging, `typeof`, number parsing and the `String` helper object.

use log::Level;

use crate::error::RuntimeError;
use crate::runtime::function::Function;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::scope::Scope;
use crate::runtime::value::{Object, Value, parse_number};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn native<F>(name: &'static str, f: F) -> Value
where
    F: Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
{
    Value::function(Function::native(name, f))
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

/// Every builtin is bound as a constant, so scripts cannot reassign it.
pub fn install(globals: &Scope) {
    globals.define_constant("log", native("log", |interp, args| {
        let message = args.iter().map(Value::as_string).collect::<Vec<_>>().join(" ");
        interp.record(Level::Info, message);
        Ok(Value::Null)
    }));
    globals.define_constant("warn", native("warn", |interp, args| {
        interp.record(Level::Warn, first(args).as_string());
        Ok(Value::Null)
    }));
    globals.define_constant("error", native("error", |interp, args| {
        interp.record(Level::Error, first(args).as_string());
        Ok(Value::Null)
    }));

    globals.define_constant("typeof", native("typeof", |_, args| Ok(Value::from(first(args).type_name()))));
    globals.define_constant("parseInt", native("parseInt", |_, args| {
        Ok(Value::Number(parse_int(&first(args).as_string())))
    }));
    globals.define_constant("parseFloat", native("parseFloat", |_, args| {
        Ok(Value::Number(parse_number(&first(args).as_string())))
    }));

    let mut string = Object::new();
    string.set("fromCharCode", native("fromCharCode", |_, args| {
        Ok(Value::from(from_char_code(first(args).as_number()).to_string()))
    }));
    globals.define_constant("String", Value::object(string));
}

// ─── Conversions ──────────────────────────────────────────────────────────────

/// Decimal parse truncated toward zero into the 32-bit range; NaN stays NaN.
fn parse_int(text: &str) -> f64 {
    let n = parse_number(text);
    if n.is_nan() { n } else { n as i32 as f64 }
}

/// UTF-16 code unit to a character. Lone surrogates become U+FFFD.
fn from_char_code(code: f64) -> char {
    let unit = code as i64 as u16;
    char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
