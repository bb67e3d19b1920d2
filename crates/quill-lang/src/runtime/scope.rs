use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeErrorKind;
use crate::runtime::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
struct Frame {
    vars: HashMap<String, Binding>,
    parent: Option<Scope>,
}

/// One link in the lexical scope chain. Cloning shares the same frame, which
/// is how closures keep the scope they were created in alive.
#[derive(Clone, Default)]
pub struct Scope(Rc<RefCell<Frame>>);

impl Scope {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Scope {
        Scope(Rc::new(RefCell::new(Frame { vars: HashMap::new(), parent: Some(self.clone()) })))
    }

    /// Bind a mutable name in this scope, replacing any binding it already holds.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, true);
    }

    /// Bind an immutable name in this scope. Hosts use this to inject globals.
    pub fn define_constant(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, false);
    }

    fn insert(&self, name: String, value: Value, mutable: bool) {
        self.0.borrow_mut().vars.insert(name, Binding { value, mutable });
    }

    /// Look `name` up along the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let frame = current.0.borrow();
                if let Some(b) = frame.vars.get(name) {
                    return Some(b.value.clone());
                }
                frame.parent.clone()
            };
            current = next?;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overwrite the nearest binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut frame = current.0.borrow_mut();
                if let Some(b) = frame.vars.get_mut(name) {
                    if !b.mutable {
                        return Err(RuntimeErrorKind::ConstReassignment { name: name.to_string() });
                    }
                    b.value = value;
                    return Ok(());
                }
                frame.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(RuntimeErrorKind::UnboundVariable { name: name.to_string() }),
            }
        }
    }

    /// Names bound directly in this scope, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().vars.keys().cloned().collect();
        names.sort();
        names
    }
}

// Frames can reach themselves through captured closures, so only the
// local names are printed.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("names", &self.local_names()).finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let global = Scope::new();
        global.define("x", Value::Number(1.0));
        let inner = global.child().child();
        assert_eq!(inner.get("x"), Some(Value::Number(1.0)));
        assert_eq!(inner.get("y"), None);
    }

    #[test]
    fn inner_definition_shadows() {
        let global = Scope::new();
        global.define("x", Value::Number(1.0));
        let inner = global.child();
        inner.define("x", Value::Number(2.0));
        assert_eq!(inner.get("x"), Some(Value::Number(2.0)));
        assert_eq!(global.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let global = Scope::new();
        global.define("x", Value::Number(1.0));
        let inner = global.child();
        inner.assign("x", Value::Number(5.0)).expect("assign");
        assert_eq!(global.get("x"), Some(Value::Number(5.0)));
    }

    #[test]
    fn assign_to_unbound_fails() {
        let err = Scope::new().assign("nope", Value::Null).unwrap_err();
        assert_eq!(err, RuntimeErrorKind::UnboundVariable { name: "nope".into() });
    }

    #[test]
    fn constants_reject_assignment() {
        let global = Scope::new();
        global.define_constant("PI", Value::Number(2.5));
        let err = global.child().assign("PI", Value::Number(3.0)).unwrap_err();
        assert_eq!(err, RuntimeErrorKind::ConstReassignment { name: "PI".into() });
        assert_eq!(global.get("PI"), Some(Value::Number(2.5)));
    }

    #[test]
    fn clones_share_the_frame() {
        let a = Scope::new();
        let b = a.clone();
        b.define("shared", Value::Bool(true));
        assert!(a.contains("shared"));
    }

    #[test]
    fn debug_lists_local_names() {
        let s = Scope::new();
        s.define("b", Value::Null);
        s.define("a", Value::Null);
        assert_eq!(format!("{s:?}"), "Scope { names: [\"a\", \"b\"], .. }");
    }
}
