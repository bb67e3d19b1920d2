//! Built-in globals, string/array methods and script output sinks.

use std::cell::RefCell;
use std::rc::Rc;

use quill_lang::{Function, Interpreter, RuntimeError, RuntimeErrorKind, Value, compile};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn exec(interp: &mut Interpreter, src: &str) -> Result<Value, RuntimeError> {
    let program = compile(src).unwrap_or_else(|errs| panic!("compile failed: {errs:#?}"));
    interp.execute(&program.statements)
}

fn run(src: &str) -> Value {
    exec(&mut Interpreter::new(), src).unwrap_or_else(|e| panic!("execute failed: {e}"))
}

fn run_err(src: &str) -> RuntimeError {
    exec(&mut Interpreter::new(), src).expect_err("expected a runtime error")
}

fn num(src: &str) -> f64 {
    match run(src) {
        Value::Number(n) => n,
        other => panic!("expected Number, got: {other:?}"),
    }
}

fn string(src: &str) -> String {
    match run(src) {
        Value::Str(s) => s.to_string(),
        other => panic!("expected Str, got: {other:?}"),
    }
}

fn boolean(src: &str) -> bool {
    match run(src) {
        Value::Bool(b) => b,
        other => panic!("expected Bool, got: {other:?}"),
    }
}

/// Render an array result as `a,b,c` for compact assertions.
fn joined(src: &str) -> String {
    match run(src) {
        Value::Array(items) => items.borrow().iter().map(Value::as_string).collect::<Vec<_>>().join(","),
        other => panic!("expected Array, got: {other:?}"),
    }
}

// ─── Globals ─────────────────────────────────────────────────────────────────

#[test]
fn typeof_reports_lowercase_tags() {
    assert_eq!(string("typeof(1)"), "number");
    assert_eq!(string(r#"typeof("s")"#), "string");
    assert_eq!(string("typeof(null)"), "null");
    assert_eq!(string("typeof(true)"), "boolean");
    assert_eq!(string("typeof([])"), "array");
    assert_eq!(string("typeof({})"), "object");
    assert_eq!(string("typeof(log)"), "function");
    assert_eq!(string("typeof(() => 1)"), "function");
}

#[test]
fn number_parsing() {
    assert_eq!(num(r#"parseInt("42")"#), 42.0);
    assert_eq!(num(r#"parseInt(" 7.9 ")"#), 7.0);
    assert!(num(r#"parseInt("x1")"#).is_nan());
    assert_eq!(num(r#"parseFloat("2.5")"#), 2.5);
    assert_eq!(num(r#"parseFloat("1e3")"#), 1000.0);
    assert!(num(r#"parseFloat("")"#).is_nan());
}

#[test]
fn from_char_code() {
    assert_eq!(string("String.fromCharCode(72) + String.fromCharCode(105)"), "Hi");
}

#[test]
fn builtins_are_constant() {
    let err = run_err("parseInt = null");
    assert_eq!(err.kind, RuntimeErrorKind::ConstReassignment { name: "parseInt".into() });
}

// ─── Strings ─────────────────────────────────────────────────────────────────

#[test]
fn string_basics() {
    assert_eq!(num(r#""héllo".length"#), 5.0);
    assert_eq!(string(r#""MiXed".toLowerCase()"#), "mixed");
    assert_eq!(string(r#""MiXed".toUpperCase()"#), "MIXED");
    assert_eq!(string(r#""  pad  ".trim()"#), "pad");
}

#[test]
fn string_searching() {
    assert!(boolean(r#""prefix-body".startsWith("prefix")"#));
    assert!(boolean(r#""file.rs".endsWith(".rs")"#));
    assert!(boolean(r#""haystack".includes("st")"#));
    assert!(boolean(r#""haystack".contains("hay")"#));
    assert!(!boolean(r#""haystack".includes("needle")"#));
    assert_eq!(num(r#""añb".indexOf("b")"#), 2.0);
    assert_eq!(num(r#""abc".indexOf("z")"#), -1.0);
}

#[test]
fn substring_clamps_and_swaps() {
    assert_eq!(string(r#""abcdef".substring(2)"#), "cdef");
    assert_eq!(string(r#""abcdef".substring(1, 3)"#), "bc");
    assert_eq!(string(r#""abcdef".substring(3, 1)"#), "bc");
    assert_eq!(string(r#""abcdef".substring(-5, 100)"#), "abcdef");
}

#[test]
fn replace_is_literal_and_global() {
    assert_eq!(string(r#""a.b.c".replace(".", "/")"#), "a/b/c");
    assert_eq!(string(r#""aaa".replace("a", "bb")"#), "bbbbbb");
}

#[test]
fn split() {
    assert_eq!(joined(r#""a,b,c".split(",")"#), "a,b,c");
    assert_eq!(num(r#""a,b,,".split(",").length"#), 2.0);
    assert_eq!(num(r#""abc".split("").length"#), 3.0);
    assert_eq!(num(r#""abc".split("|").length"#), 1.0);
}

#[test]
fn unknown_string_member_is_null() {
    assert_eq!(run(r#""abc".nope"#), Value::Null);
}

// ─── Arrays: mutation ────────────────────────────────────────────────────────

#[test]
fn push_pop_shift_unshift() {
    assert_eq!(num("let a = [1]; a.push(2, 3)"), 3.0);
    assert_eq!(num("let a = [1, 2]; a.pop()"), 2.0);
    assert_eq!(run("[].pop()"), Value::Null);
    assert_eq!(num("let a = [1, 2]; a.shift()"), 1.0);
    assert_eq!(run("[].shift()"), Value::Null);
    assert_eq!(joined("let a = [3]; a.unshift(1, 2); a"), "1,2,3");
}

#[test]
fn reverse_is_in_place() {
    assert_eq!(joined("let a = [1, 2, 3]; a.reverse(); a"), "3,2,1");
    assert!(boolean("let a = [1, 2]; let b = a.reverse(); b.push(0); a.length == 3"));
}

// ─── Arrays: queries ─────────────────────────────────────────────────────────

#[test]
fn index_of_and_includes_use_strict_equality() {
    assert_eq!(num("[1, 2, 3].indexOf(2)"), 1.0);
    assert_eq!(num(r#"[1, 2, 3].indexOf("2")"#), -1.0);
    assert!(boolean("[[1], [2]].includes([2])"));
    assert!(!boolean("[null].includes(false)"));
}

#[test]
fn slice() {
    assert_eq!(joined("[1, 2, 3, 4].slice(1, 3)"), "2,3");
    assert_eq!(joined("[1, 2, 3, 4].slice(-2)"), "3,4");
    assert_eq!(joined("[1, 2, 3, 4].slice()"), "1,2,3,4");
    assert_eq!(joined("[1, 2, 3].slice(2, 1)"), "");
}

#[test]
fn concat_join_flat() {
    assert_eq!(joined("[1].concat([2, 3], 4, [[5]])"), "1,2,3,4,[Array]");
    assert_eq!(string("[1, 2, 3].join()"), "1,2,3");
    assert_eq!(string(r#"[1, 2, 3].join(" - ")"#), "1 - 2 - 3");
    assert_eq!(joined("[1, [2, [3, [4]]]].flat()"), "1,2,[Array]");
    assert_eq!(joined("[1, [2, [3, [4]]]].flat(3)"), "1,2,3,4");
}

// ─── Arrays: callbacks ───────────────────────────────────────────────────────

#[test]
fn map_filter_flat_map() {
    assert_eq!(joined("[1, 2, 3].map((x) => x * 2)"), "2,4,6");
    assert_eq!(joined("[1, 2, 3, 4].filter((x) => x % 2 == 0)"), "2,4");
    assert_eq!(joined("[1, 2].flatMap((x) => [x, x * 10])"), "1,10,2,20");
    assert_eq!(joined("[10, 20].map((x, i) => i)"), "0,1");
}

#[test]
fn find_and_predicates() {
    assert_eq!(num("[5, 12, 8].find((x) => x > 10)"), 12.0);
    assert_eq!(run("[1, 2].find((x) => x > 10)"), Value::Null);
    assert_eq!(num("[5, 12, 8].findIndex((x) => x > 10)"), 1.0);
    assert_eq!(num("[5].findIndex((x) => x > 10)"), -1.0);
    assert!(boolean("[1, 2, 3].some((x) => x > 2)"));
    assert!(!boolean("[].some((x) => true)"));
    assert!(boolean("[2, 4].every((x) => x % 2 == 0)"));
    assert!(boolean("[].every((x) => false)"));
}

#[test]
fn for_each_sees_the_array() {
    assert_eq!(num("let n = 0; [1, 2, 3].forEach((x, i, arr) => { n += arr.length; }); n"), 9.0);
}

#[test]
fn reduce() {
    assert_eq!(num("[1, 2, 3, 4].reduce((acc, x) => acc + x)"), 10.0);
    assert_eq!(num("[1, 2, 3].reduce((acc, x) => acc + x, 10)"), 16.0);
    assert_eq!(num("[].reduce((acc, x) => acc + x, 0)"), 0.0);
    assert_eq!(num("[5, 6].reduce((acc, x, i) => acc + i, 0)"), 1.0);
}

#[test]
fn reduce_on_empty_without_initial_value() {
    let err = run_err("[].reduce((a, b) => a + b)");
    assert_eq!(err.kind, RuntimeErrorKind::EmptyReduce);
    assert_eq!(err.line, 1);
}

#[test]
fn callbacks_must_be_functions() {
    let err = run_err("[1].map(5)");
    assert_eq!(err.kind, RuntimeErrorKind::CallbackRequired { method: "map" });
    let err = run_err("[1].filter()");
    assert_eq!(err.kind, RuntimeErrorKind::CallbackRequired { method: "filter" });
}

#[test]
fn callbacks_may_mutate_the_array() {
    assert_eq!(num("let a = [1, 2]; let n = 0; a.forEach((x) => { n++; if (a.length < 4) a.push(x); }); n"), 4.0);
}

#[test]
fn callback_errors_propagate() {
    let err = run_err(r#"[1].map((x) => { throw "bad " + x; })"#);
    assert_eq!(err.message(), "bad 1");
}

// ─── Host integration ────────────────────────────────────────────────────────

#[test]
fn host_native_functions() {
    let mut interp = Interpreter::new();
    let double = Function::native("double", |_, args| {
        Ok(Value::Number(args.first().map_or(0.0, Value::as_number) * 2.0))
    });
    interp.global_scope().define_constant("double", Value::function(double));
    assert_eq!(exec(&mut interp, "[1, 2].map(double)").map(|v| v.as_string()), Ok("[Array]".into()));
    assert_eq!(exec(&mut interp, "double(21)"), Ok(Value::Number(42.0)));
}

#[test]
fn host_native_errors_are_catchable() {
    let mut interp = Interpreter::new();
    let fail = Function::native("fail", |_, _| Err(RuntimeError::thrown("host refused")));
    interp.global_scope().define_constant("fail", Value::function(fail));
    let caught = exec(&mut interp, "let m; try { fail(); } catch (e) { m = e; } m").expect("caught");
    assert_eq!(caught, Value::from("host refused"));
    let err = exec(&mut interp, "\n\nfail()").expect_err("uncaught");
    assert_eq!(err.line, 3);
}

#[test]
fn native_handles_pass_through_scripts() {
    let mut interp = Interpreter::new();
    interp.global_scope().define_constant("node", Value::native("MethodNode", 17_u32));
    let out = exec(&mut interp, "let n = node; n").expect("run");
    match out {
        Value::Native(handle) => assert_eq!(handle.downcast_ref::<u32>(), Some(&17)),
        other => panic!("expected native, got {other:?}"),
    }
    assert_eq!(exec(&mut interp, r#""" + node"#), Ok(Value::from("MethodNode")));
    assert_eq!(exec(&mut interp, "typeof(node)"), Ok(Value::from("native")));
}

// ─── Script output ───────────────────────────────────────────────────────────

#[test]
fn messages_are_retained() {
    let mut interp = Interpreter::new();
    exec(&mut interp, r#"log("a", 1, true); warn("careful"); error("broken")"#).expect("run");
    assert_eq!(interp.logs(), ["a 1 true"]);
    assert_eq!(interp.warnings(), ["careful"]);
    assert_eq!(interp.errors(), ["broken"]);

    interp.clear_logs();
    assert!(interp.logs().is_empty() && interp.warnings().is_empty() && interp.errors().is_empty());
}

#[test]
fn sinks_receive_messages() {
    let out = Rc::new(RefCell::new(Vec::new()));
    let mut interp = Interpreter::new();
    let sink = out.clone();
    interp.set_log_sink(move |m| sink.borrow_mut().push(m.to_string()));
    let sink = out.clone();
    interp.set_warn_sink(move |m| sink.borrow_mut().push(m.to_string()));
    let sink = out.clone();
    interp.set_error_sink(move |m| sink.borrow_mut().push(m.to_string()));

    exec(&mut interp, r#"log("x" + 1); warn("w"); error("e")"#).expect("run");
    assert_eq!(*out.borrow(), ["x1", "WARN: w", "ERROR: e"]);
    assert_eq!(interp.warnings(), ["w"]);
}

#[test]
fn log_returns_null() {
    assert_eq!(run("log()"), Value::Null);
}
