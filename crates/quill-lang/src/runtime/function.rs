use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::scope::Scope;
use crate::runtime::value::Value;
use crate::syntax::ast::FunctionDef;

/// Signature every host-supplied function implements.
pub type NativeFn = dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A callable value. User functions close over the scope they were created
/// in; natives are plain Rust closures. Both are invoked through [`Function::call`].
pub enum Function {
    User {
        def: Rc<FunctionDef>,
        closure: Scope,
    },
    Native {
        name: String,
        func: Box<NativeFn>,
    },
}

impl Function {
    pub fn native<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        Function::Native { name: name.into(), func: Box::new(func) }
    }

    pub fn name(&self) -> &str {
        match self {
            Function::User { def, .. } => def.name.as_deref().unwrap_or("<anonymous>"),
            Function::Native { name, .. } => name,
        }
    }

    /// Missing arguments arrive as null; extra ones are ignored.
    pub fn call(&self, interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Function::User { def, closure } => interp.call_user(def, closure, args),
            Function::Native { func, .. } => func(interp, args),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::User { def, .. } => write!(f, "Function({}/{})", self.name(), def.params.len()),
            Function::Native { name, .. } => write!(f, "NativeFunction({name})"),
        }
    }
}
