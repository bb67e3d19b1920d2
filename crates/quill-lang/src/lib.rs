pub mod error;
pub mod runtime;
pub mod script;
pub mod syntax;

pub use error::{Error, ErrorCode, RuntimeError, RuntimeErrorKind};
pub use runtime::function::Function;
pub use runtime::interpreter::Interpreter;
pub use runtime::scope::Scope;
pub use runtime::value::{NativeHandle, Object, Value};
pub use script::{Script, ScriptMode};
pub use syntax::ast::Program;
pub use syntax::lexer::Lexer;
pub use syntax::parser::Parser;
pub use syntax::token::{Token, TokenKind};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lex and parse source text. On failure returns every error of the first
/// stage that reported any, so syntax errors never pile up behind lexical ones.
pub fn compile(source: &str) -> Result<Program, Vec<Error>> {
    let (tokens, errors) = Lexer::new(source).tokenize();
    if !errors.is_empty() {
        return Err(errors);
    }
    let (statements, errors) = Parser::new(tokens).parse();
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(Program { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_errors_stop_before_parsing() {
        let errs = compile("let x = 1 & 2; let = ;").unwrap_err();
        assert!(errs.iter().all(|e| e.code.is_lexical()), "{errs:?}");
    }

    #[test]
    fn syntax_errors_are_all_reported() {
        let errs = compile("let = 1;\nlet y = ;\n").unwrap_err();
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert!(errs.iter().all(|e| !e.code.is_lexical()));
    }

    #[test]
    fn compiled_program_runs() {
        let program = compile("let a = [1, 2, 3]; a.length").expect("compile");
        let value = Interpreter::new().execute(&program.statements).expect("run");
        assert_eq!(value, Value::Number(3.0));
    }
}
