use thiserror::Error as ThisError;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // invalid assignment target
    P004, // try without catch or finally
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::P004 => "P004",
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::L001 | Self::L002)
    }
}

/// A positioned lexer or parser diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] line {}, column {}: {}", self.code.as_str(), self.line, self.column, self.message)
    }
}

impl std::error::Error for Error {}

// ─────────────────────────────────────────────────────────────────────────────

/// Everything that can abort evaluation. The message is what a script's
/// `catch (e)` sees, so it never includes the line.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable: {name}")]
    UnboundVariable { name: String },
    #[error("Cannot reassign constant: {name}")]
    ConstReassignment { name: String },
    #[error("Cannot call non-function: {value}")]
    NotCallable { value: String },
    #[error("Invalid operand for {op}")]
    InvalidUpdateOperand { op: &'static str },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("'break' outside of loop")]
    BreakOutsideLoop,
    #[error("'continue' outside of loop")]
    ContinueOutsideLoop,
    #[error("reduce of empty array with no initial value")]
    EmptyReduce,
    #[error("{method} requires a function argument")]
    CallbackRequired { method: &'static str },
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("Maximum call stack size exceeded")]
    CallStackOverflow,
    /// Raised by a script-level `throw` or by a host native function.
    #[error("{0}")]
    Thrown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub line: usize,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(line: usize, kind: RuntimeErrorKind) -> Self {
        Self { line, kind }
    }

    /// A failure raised outside any particular source line, e.g. by a
    /// host-supplied native function.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self { line: 0, kind: RuntimeErrorKind::Thrown(message.into()) }
    }

    /// The message a script `catch` parameter receives.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Attach a line to an error that was raised without one.
    pub(crate) fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 { self.line = line; }
        self
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[runtime] line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for RuntimeError {}
