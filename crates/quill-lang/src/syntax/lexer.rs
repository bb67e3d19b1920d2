use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer {
    source: Vec<char>,
    start: usize,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    errors: Vec<Error>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            start: 0,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source. Never fails: lexical errors are collected and
    /// also emitted inline as `TokenKind::Error` tokens. The token list
    /// always ends with exactly one `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Error>) {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        (self.tokens, self.errors)
    }

    fn scan_token(&mut self) {
        self.start = self.pos;
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '%' => TokenKind::Percent,

            '+' => {
                if self.matches('+') { TokenKind::PlusPlus }
                else if self.matches('=') { TokenKind::PlusEq }
                else { TokenKind::Plus }
            }
            '-' => {
                if self.matches('-') { TokenKind::MinusMinus }
                else if self.matches('=') { TokenKind::MinusEq }
                else { TokenKind::Minus }
            }
            '*' => {
                if self.matches('=') { TokenKind::StarEq } else { TokenKind::Star }
            }
            '/' => {
                if self.matches('/') { self.skip_line(); return; }
                else if self.matches('*') { self.skip_block_comment(); return; }
                else if self.matches('=') { TokenKind::SlashEq }
                else { TokenKind::Slash }
            }
            '=' => {
                if self.matches('>') { TokenKind::FatArrow }
                else if self.matches('=') { TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            '!' => {
                if self.matches('=') { TokenKind::BangEq } else { TokenKind::Bang }
            }
            '<' => {
                if self.matches('=') { TokenKind::LtEq } else { TokenKind::Lt }
            }
            '>' => {
                if self.matches('=') { TokenKind::GtEq } else { TokenKind::Gt }
            }
            '?' => {
                // `a ?.5 : b` is a ternary over `.5`, not optional chaining
                if self.peek() == '.' && !self.peek_next().is_ascii_digit() {
                    self.advance();
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                }
            }
            '&' => {
                if self.matches('&') { TokenKind::AndAnd }
                else { return self.error(line, col, ErrorCode::L001, "Unexpected character '&'. Did you mean '&&'?"); }
            }
            '|' => {
                if self.matches('|') { TokenKind::OrOr }
                else { return self.error(line, col, ErrorCode::L001, "Unexpected character '|'. Did you mean '||'?"); }
            }

            '"' | '\'' => match self.read_string(ch, line, col) {
                Some(s) => TokenKind::Str(s),
                None => return,
            },
            c if c.is_ascii_digit() => TokenKind::Number(self.read_number()),
            c if is_ident_start(c) => keyword_or_ident(self.read_ident()),

            other => {
                return self.error(line, col, ErrorCode::L001, format!("Unexpected character '{other}'"));
            }
        };

        let text: String = self.source[self.start..self.pos].iter().collect();
        self.tokens.push(Token::new(kind, text, line, col));
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> char {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == '\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> char {
        if self.is_at_end() { '\0' } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> char {
        if self.pos + 1 >= self.source.len() { '\0' } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' { self.advance(); }
    }

    /// Block comments nest: every `/*` needs its own `*/`.
    /// An unclosed comment runs to the end of input.
    fn skip_block_comment(&mut self) {
        let mut depth = 1;
        while depth > 0 && !self.is_at_end() {
            if self.peek() == '/' && self.peek_next() == '*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }
    }

    fn error(&mut self, line: usize, column: usize, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        self.tokens.push(Token::new(TokenKind::Error(message.clone()), message.clone(), line, column));
        self.errors.push(Error::new(code, line, column, message));
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Returns `None` when the string is unterminated; the error has already
    /// been recorded and the lexer sits at end of input.
    fn read_string(&mut self, quote: char, start_line: usize, start_col: usize) -> Option<String> {
        let mut s = String::new();
        while !self.is_at_end() && self.peek() != quote {
            let ch = self.advance();
            if ch == '\\' {
                if self.is_at_end() { break; }
                match self.advance() {
                    'n'  => s.push('\n'),
                    't'  => s.push('\t'),
                    'r'  => s.push('\r'),
                    // `\\`, `\"`, `\'` and unknown escapes all pass the character through
                    other => s.push(other),
                }
            } else {
                s.push(ch);
            }
        }

        if self.is_at_end() {
            self.error(
                start_line,
                start_col,
                ErrorCode::L002,
                format!("Unterminated string starting at {start_line}:{start_col}"),
            );
            return None;
        }

        self.advance(); // closing quote
        Some(s)
    }

    fn read_number(&mut self) -> f64 {
        while self.peek().is_ascii_digit() { self.advance(); }

        // consume decimal only if followed by at least one digit
        // (avoids treating `.` in `1.toString` as a decimal point)
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() { self.advance(); }
        }

        if matches!(self.peek(), 'e' | 'E') && self.exponent_follows() {
            self.advance();
            if matches!(self.peek(), '+' | '-') { self.advance(); }
            while self.peek().is_ascii_digit() { self.advance(); }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        text.parse().unwrap_or(f64::NAN)
    }

    /// True when the `e`/`E` at the cursor begins a well-formed exponent.
    fn exponent_follows(&self) -> bool {
        let after = self.peek_next();
        if after.is_ascii_digit() { return true; }
        matches!(after, '+' | '-')
            && self.source.get(self.pos + 2).is_some_and(|c| c.is_ascii_digit())
    }

    fn read_ident(&mut self) -> String {
        while is_ident_continue(self.peek()) { self.advance(); }
        self.source[self.start..self.pos].iter().collect()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
