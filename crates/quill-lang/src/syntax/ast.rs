use std::rc::Rc;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

// ─── Functions ───────────────────────────────────────────────────────────────

/// Shared by arrow functions, `function` expressions and declarations.
/// Held behind an `Rc` so a closure value can point at its definition
/// without copying the body.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FunctionBody,
    pub span: Span,
}

#[derive(Debug)]
pub enum FunctionBody {
    /// `(x) => { ... }` and every `function` form
    Block(Vec<Stmt>),
    /// `(x) => x + 1`
    Expr(Expr),
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// A standalone expression, e.g. a call or an assignment.
    Expr(Expr),
    /// `let x = 1`, `let x`, `const PI = 3.14`
    VarDecl {
        name: String,
        is_const: bool,
        initializer: Option<Expr>,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// `return expr` or bare `return`
    Return(Option<Expr>, Span),
    Block(Vec<Stmt>, Span),
    While {
        condition: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        span: Span,
    },
    /// C-style `for (init; condition; update) body`; every part is optional.
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    /// `for (let x of xs)` / `for (const k in obj)`
    ForEach {
        name: String,
        is_const: bool,
        kind: ForEachKind,
        iterable: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Try {
        block: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
        span: Span,
    },
    Throw(Expr, Span),
    /// `function name(a, b) { ... }`
    Function(Rc<FunctionDef>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForEachKind {
    /// binds elements, values or characters
    Of,
    /// binds indices or keys
    In,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::VarDecl { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForEach { span, .. }
            | Stmt::Try { span, .. } => *span,
            Stmt::Return(_, s)
            | Stmt::Block(_, s)
            | Stmt::Break(s)
            | Stmt::Continue(s)
            | Stmt::Throw(_, s) => *s,
            Stmt::Function(def) => def.span,
        }
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    Null(Span),
    Ident(String, Span),

    /// `[a, b, c]`
    Array(Vec<Expr>, Span),
    /// `{ a: 1, "b": 2 }`; keys keep source order
    Object(Vec<(String, Expr)>, Span),

    /// `a + b`, `a == b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `a && b`, `a || b`; the right side may never be evaluated
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `!x`, `-x`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `object.property` or `object?.property`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
        span: Span,
    },

    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// `cond ? then : else`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },

    /// `++x`, `x--`
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        span: Span,
    },

    /// `target = value`
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },

    /// `target += value`; `op` is one of Add, Sub, Mul, Div
    CompoundAssign {
        target: Box<Expr>,
        op: BinOp,
        value: Box<Expr>,
        span: Span,
    },

    /// Arrow function or `function` expression.
    Function(Rc<FunctionDef>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, s)
            | Expr::Str(_, s)
            | Expr::Bool(_, s)
            | Expr::Null(s)
            | Expr::Ident(_, s)
            | Expr::Array(_, s)
            | Expr::Object(_, s) => *s,
            Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Update { span, .. }
            | Expr::Assign { span, .. }
            | Expr::CompoundAssign { span, .. } => *span,
            Expr::Function(def) => def.span,
        }
    }

    /// Identifiers, member accesses and index accesses can be written to.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Ident(..) | Expr::Member { optional: false, .. } | Expr::Index { .. })
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}
