//! Terminal rendering for diagnostics, tokens and syntax trees.

use quill_lang::{Error, RuntimeError, Token, TokenKind};
use quill_lang::syntax::ast::Stmt;

fn red(text: &str) -> String {
    format!("\u{001b}[31m{text}\u{001b}[0m")
}

fn yellow(text: &str) -> String {
    format!("\u{001b}[33m{text}\u{001b}[0m")
}

fn bold(text: &str) -> String {
    format!("\u{001b}[1m{text}\u{001b}[0m")
}

/// The failing line with one line of context above it. Lines are 1-based;
/// 0 means the location is unknown and no frame is drawn.
fn code_frame(file: &str, source: &str, line: usize) {
    if line == 0 {
        return;
    }
    eprintln!("    ╭─[{file}]");
    let start = line.saturating_sub(1).max(1);
    for n in start..=line {
        if let Some(text) = source.lines().nth(n - 1) {
            eprintln!("{n:>3} │ {}", text.replace('\r', ""));
        }
    }
    eprintln!("────╯");
}

pub fn error_message(message: &str) {
    eprintln!("{} {}", bold(&red("Error:")), bold(message));
}

pub fn warning_message(message: &str) {
    eprintln!("{} {}", bold(&yellow("Warning:")), bold(message));
}

pub fn errors(file: &str, source: &str, errors: &[Error]) {
    for error in errors {
        error_message(&format!("[{}] {}", error.code.as_str(), error.message));
        code_frame(file, source, error.line);
    }
}

pub fn runtime_error(file: &str, source: &str, error: &RuntimeError) {
    error_message(&error.message());
    code_frame(file, source, error.line);
}

pub fn tokens(tokens: &[Token]) {
    let mut line = 0;
    println!("     ╭─[Tokens]");
    for token in tokens {
        if token.line == line {
            print!("     │ ");
        } else {
            print!("{:>4} │ ", token.line);
            line = token.line;
        }
        match &token.kind {
            TokenKind::Eof => println!("Eof"),
            kind => println!("{kind:?} ({})", token.text),
        }
    }
    println!("─────╯");
}

pub fn ast(statements: &[Stmt]) {
    for stmt in statements {
        println!("{stmt:#?}");
    }
}
