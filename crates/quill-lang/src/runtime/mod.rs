pub mod builtins;
pub mod function;
pub mod interpreter;
pub mod methods;
pub mod scope;
pub mod value;
