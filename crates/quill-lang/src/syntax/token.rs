#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(String),
    Ident(String),
    Bool(bool),
    Null,

    // Keywords
    Let,
    Const,
    If,
    Else,
    Return,
    Function,
    For,
    While,
    Do,
    Break,
    Continue,
    In,
    Of,
    Try,
    Catch,
    Finally,
    Throw,

    // Operators
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    Percent,       // %
    Eq,            // =
    EqEq,          // ==
    BangEq,        // !=
    Lt,            // <
    LtEq,          // <=
    Gt,            // >
    GtEq,          // >=
    AndAnd,        // &&
    OrOr,          // ||
    Bang,          // !
    PlusPlus,      // ++
    MinusMinus,    // --
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    SlashEq,       // /=
    FatArrow,      // =>
    Question,      // ?
    QuestionDot,   // ?.

    // Punctuation
    Colon,      // :
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]

    /// Synthetic token marking a lexical error; carries the message.
    Error(String),
    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Str(_) | Self::Bool(_) | Self::Null)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Let | Self::Const | Self::If | Self::Else | Self::Return | Self::Function
            | Self::For | Self::While | Self::Do | Self::Break | Self::Continue | Self::In
            | Self::Of | Self::Try | Self::Catch | Self::Finally | Self::Throw
            | Self::Bool(_) | Self::Null
        )
    }

    /// Keywords the parser resynchronizes on after a syntax error.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Self::Let | Self::Const | Self::If | Self::Return | Self::Function | Self::For
            | Self::While | Self::Do | Self::Break | Self::Continue | Self::Try | Self::Throw
        )
    }

    pub fn is_compound_assign(&self) -> bool {
        matches!(self, Self::PlusEq | Self::MinusEq | Self::StarEq | Self::SlashEq)
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "let"      => TokenKind::Let,
        "const"    => TokenKind::Const,
        "if"       => TokenKind::If,
        "else"     => TokenKind::Else,
        "return"   => TokenKind::Return,
        "function" => TokenKind::Function,
        "for"      => TokenKind::For,
        "while"    => TokenKind::While,
        "do"       => TokenKind::Do,
        "break"    => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "in"       => TokenKind::In,
        "of"       => TokenKind::Of,
        "try"      => TokenKind::Try,
        "catch"    => TokenKind::Catch,
        "finally"  => TokenKind::Finally,
        "throw"    => TokenKind::Throw,
        "true"     => TokenKind::Bool(true),
        "false"    => TokenKind::Bool(false),
        "null"     => TokenKind::Null,
        _          => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source slice the token was read from.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, text: text.into(), line, column }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "`{}`", self.text),
        }
    }
}
