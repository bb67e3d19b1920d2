use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};

/// How deep statements and expressions may nest before parsing gives up.
const MAX_NESTING: usize = 200;
const TOO_DEEP: &str = "Expression nested too deeply";

// Stack reserved before a nested rule runs, and the size of each new segment.
const RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // the cursor relies on a trailing Eof to never run off the end
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self { tokens, pos: 0, depth: 0 }
    }

    /// Parse every top-level statement. A statement that fails records its
    /// error and the parser resynchronizes, so one pass reports every
    /// independent syntax error.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<Error>) {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            if self.matches(TokenKind::Semicolon) {
                continue;
            }
            let pos_before = self.pos;

            match self.parse_stmt() {
                Ok(s) => statements.push(s),
                Err(e) => {
                    errors.push(e);
                    self.recover();
                }
            }

            // guarantee progress so a stuck token cannot loop forever
            if self.pos == pos_before {
                self.advance();
            }
        }

        (statements, errors)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.matches(TokenKind::Semicolon) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "'}' after block")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        self.nested("Statements nested too deeply", Self::parse_stmt_body)
    }

    fn parse_stmt_body(&mut self) -> Result<Stmt, Error> {
        let stmt = match self.peek().kind {
            TokenKind::Let      => self.parse_var_decl()?,
            TokenKind::Const    => self.parse_var_decl()?,
            TokenKind::If       => return self.parse_if(),
            TokenKind::While    => return self.parse_while(),
            TokenKind::Do       => self.parse_do_while()?,
            TokenKind::For      => return self.parse_for(),
            TokenKind::Try      => return self.parse_try(),
            TokenKind::Return   => self.parse_return()?,
            TokenKind::Throw    => self.parse_throw()?,
            TokenKind::Break    => { let span = self.span(); self.advance(); Stmt::Break(span) }
            TokenKind::Continue => { let span = self.span(); self.advance(); Stmt::Continue(span) }
            TokenKind::LBrace   => {
                let span = self.span();
                return Ok(Stmt::Block(self.parse_block()?, span));
            }
            TokenKind::Function if matches!(self.peek_at(1), TokenKind::Ident(_)) => {
                return self.parse_function_decl();
            }
            _ => Stmt::Expr(self.parse_expr()?),
        };
        self.matches(TokenKind::Semicolon);
        Ok(stmt)
    }

    /// `let x = e`, `let x`, `const x = e`. Leaves any `;` for the caller so
    /// the same routine serves `for` initializers.
    fn parse_var_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let is_const = self.advance().kind == TokenKind::Const;
        let name = self.expect_ident()?;
        let initializer = if is_const {
            self.expect(TokenKind::Eq, "'=' after constant name")?;
            Some(self.parse_expr()?)
        } else if self.matches(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl { name, is_const, initializer, span })
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If, "'if'")?;
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.matches(TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If { condition, then_branch, else_branch, span })
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.parse_condition("while")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { condition, body, span })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Do, "'do'")?;
        let body = Box::new(self.parse_stmt()?);
        self.expect(TokenKind::While, "'while' after do body")?;
        let condition = self.parse_condition("while")?;
        Ok(Stmt::DoWhile { body, condition, span })
    }

    /// Parenthesized condition of `if`, `while` and `do ... while`.
    fn parse_condition(&mut self, keyword: &str) -> Result<Expr, Error> {
        self.expect(TokenKind::LParen, &format!("'(' after '{keyword}'"))?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after condition")?;
        Ok(condition)
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For, "'for'")?;
        self.expect(TokenKind::LParen, "'(' after 'for'")?;

        // for (let|const name of|in iterable)
        if matches!(self.peek().kind, TokenKind::Let | TokenKind::Const)
            && matches!(self.peek_at(1), TokenKind::Ident(_))
            && matches!(self.peek_at(2), TokenKind::Of | TokenKind::In)
        {
            let is_const = self.advance().kind == TokenKind::Const;
            let name = self.expect_ident()?;
            let kind = if self.advance().kind == TokenKind::Of { ForEachKind::Of } else { ForEachKind::In };
            let iterable = self.parse_expr()?;
            self.expect(TokenKind::RParen, "')' after for-each iterable")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::ForEach { name, is_const, kind, iterable, body, span });
        }

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if matches!(self.peek().kind, TokenKind::Let | TokenKind::Const) {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expr()?)))
        };
        self.expect(TokenKind::Semicolon, "';' after loop initializer")?;

        let condition = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon, "';' after loop condition")?;

        let update = if self.check(TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::RParen, "')' after for clauses")?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For { init, condition, update, body, span })
    }

    fn parse_try(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Try, "'try'")?;
        let block = self.parse_block()?;

        let catch = if self.check(TokenKind::Catch) {
            let catch_span = self.span();
            self.advance();
            self.expect(TokenKind::LParen, "'(' after 'catch'")?;
            let param = self.expect_ident()?;
            self.expect(TokenKind::RParen, "')' after catch parameter")?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body, span: catch_span })
        } else {
            None
        };

        let finally = if self.matches(TokenKind::Finally) { Some(self.parse_block()?) } else { None };

        if catch.is_none() && finally.is_none() {
            return Err(Error::new(
                ErrorCode::P004,
                span.line,
                span.column,
                "Expected 'catch' or 'finally' after try block",
            ));
        }
        Ok(Stmt::Try { block, catch, finally, span })
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return, "'return'")?;
        let kind = &self.peek().kind;
        let bare = matches!(kind, TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
            || kind.starts_statement();
        let value = if bare { None } else { Some(self.parse_expr()?) };
        Ok(Stmt::Return(value, span))
    }

    fn parse_throw(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Throw, "'throw'")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Throw(value, span))
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Function, "'function'")?;
        let name = self.expect_ident()?;
        let def = self.parse_function_rest(Some(name), span)?;
        Ok(Stmt::Function(def))
    }

    /// `(params) { body }` after `function` and an optional name.
    fn parse_function_rest(&mut self, name: Option<String>, span: Span) -> Result<Rc<FunctionDef>, Error> {
        self.expect(TokenKind::LParen, "'(' before parameters")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "')' after parameters")?;
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(Rc::new(FunctionDef { name, params, body, span }))
    }

    fn parse_params(&mut self) -> Result<Vec<String>, Error> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            params.push(self.expect_ident()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(params)
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        self.nested(TOO_DEEP, Self::parse_assignment_body)
    }

    /// Right-associative: `a = b = 1` assigns `b` first.
    fn parse_assignment_body(&mut self) -> Result<Expr, Error> {
        let target = self.parse_ternary()?;

        let compound = match self.peek().kind {
            TokenKind::Eq      => None,
            TokenKind::PlusEq  => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq  => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            _ => return Ok(target),
        };
        let op_tok = self.advance();
        if !target.is_assignable() {
            return Err(Error::new(ErrorCode::P003, op_tok.line, op_tok.column, "Invalid assignment target"));
        }

        let span = target.span();
        let target = Box::new(target);
        let value = Box::new(self.parse_assignment()?);
        Ok(match compound {
            None => Expr::Assign { target, value, span },
            Some(op) => Expr::CompoundAssign { target, op, value, span },
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, Error> {
        let condition = self.parse_or()?;
        if !self.matches(TokenKind::Question) {
            return Ok(condition);
        }
        let span = condition.span();
        let then_expr = self.parse_assignment()?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let else_expr = self.nested(TOO_DEEP, Self::parse_ternary)?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.matches(TokenKind::OrOr) {
            let span = left.span();
            let right = self.parse_and()?;
            left = Expr::Logical { left: Box::new(left), op: LogicalOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.matches(TokenKind::AndAnd) {
            let span = left.span();
            let right = self.parse_equality()?;
            left = Expr::Logical { left: Box::new(left), op: LogicalOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_addition()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Minus) {
            let operand = self.nested(TOO_DEEP, Self::parse_unary)?;
            return Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), span });
        }
        if self.matches(TokenKind::Bang) {
            let operand = self.nested(TOO_DEEP, Self::parse_unary)?;
            return Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand), span });
        }
        let update = match self.peek().kind {
            TokenKind::PlusPlus   => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            // validity of the operand is checked when it runs
            let target = self.nested(TOO_DEEP, Self::parse_unary)?;
            return Ok(Expr::Update { op, prefix: true, target: Box::new(target), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            let span = expr.span();
            match self.peek().kind {
                // call: expr(args)
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arg_list()?;
                    self.expect(TokenKind::RParen, "')' after arguments")?;
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }

                // member access: expr.name or expr?.name
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.advance().kind == TokenKind::QuestionDot;
                    let property = self.expect_property_name()?;
                    expr = Expr::Member { object: Box::new(expr), property, optional, span };
                }

                // index: expr[i]
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']' after index")?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index), span };
                }

                // postfix update binds only on the operand's line; otherwise
                // the `++` starts the next statement
                TokenKind::PlusPlus | TokenKind::MinusMinus if self.on_previous_line() => {
                    let op = if self.advance().kind == TokenKind::PlusPlus {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    expr = Expr::Update { op, prefix: false, target: Box::new(expr), span };
                }

                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Number(v) => { self.advance(); Ok(Expr::Number(v, span)) }
            TokenKind::Str(s)    => { self.advance(); Ok(Expr::Str(s, span)) }
            TokenKind::Bool(v)   => { self.advance(); Ok(Expr::Bool(v, span)) }
            TokenKind::Null      => { self.advance(); Ok(Expr::Null(span)) }

            // identifier, or `x => body`
            TokenKind::Ident(name) => {
                self.advance();
                if self.matches(TokenKind::FatArrow) {
                    let body = self.parse_arrow_body()?;
                    let def = FunctionDef { name: None, params: vec![name], body, span };
                    return Ok(Expr::Function(Rc::new(def)));
                }
                Ok(Expr::Ident(name, span))
            }

            // arrow function or grouped expression
            TokenKind::LParen => {
                if self.is_arrow_start() {
                    self.parse_arrow()
                } else {
                    self.advance();
                    let expr = self.parse_expr()?;
                    self.expect(TokenKind::RParen, "')' after expression")?;
                    Ok(expr)
                }
            }

            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenKind::RBracket) && !self.is_at_end() {
                    items.push(self.parse_assignment()?);
                    if !self.matches(TokenKind::Comma) { break; }
                }
                self.expect(TokenKind::RBracket, "']' after array elements")?;
                Ok(Expr::Array(items, span))
            }

            TokenKind::LBrace => self.parse_object_literal(),

            // function expression: `function (a) { }` or `function name(a) { }`
            TokenKind::Function => {
                self.advance();
                let name = match &self.peek().kind {
                    TokenKind::Ident(n) => { let n = n.clone(); self.advance(); Some(n) }
                    _ => None,
                };
                Ok(Expr::Function(self.parse_function_rest(name, span)?))
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut props = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let key_tok = self.advance();
            let key_span = Span::new(key_tok.line, key_tok.column);
            let key = match &key_tok.kind {
                TokenKind::Ident(s) | TokenKind::Str(s) => s.clone(),
                TokenKind::Number(n) => number_key(*n),
                k if k.is_keyword() => key_tok.text.clone(),
                _ => return Err(self.error_at(&key_tok, "Expected property name in object literal")),
            };

            let shorthand = matches!(key_tok.kind, TokenKind::Ident(_))
                && (self.check(TokenKind::Comma) || self.check(TokenKind::RBrace));
            let value = if shorthand {
                Expr::Ident(key.clone(), key_span)
            } else {
                self.expect(TokenKind::Colon, "':' after property name")?;
                self.parse_assignment()?
            };
            props.push((key, value));

            if !self.matches(TokenKind::Comma) { break; }
        }

        self.expect(TokenKind::RBrace, "'}' after object literal")?;
        Ok(Expr::Object(props, span))
    }

    fn parse_arrow(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "')' after parameters")?;
        self.expect(TokenKind::FatArrow, "'=>'")?;
        let body = self.parse_arrow_body()?;
        Ok(Expr::Function(Rc::new(FunctionDef { name: None, params, body, span })))
    }

    fn parse_arrow_body(&mut self) -> Result<FunctionBody, Error> {
        if self.check(TokenKind::LBrace) {
            Ok(FunctionBody::Block(self.parse_block()?))
        } else {
            Ok(FunctionBody::Expr(self.parse_assignment()?))
        }
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_assignment()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(args)
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    /// Run a rule one nesting level deeper. Past `MAX_NESTING` this is a
    /// P001 error at the current token rather than a native stack overflow.
    fn nested<T>(&mut self, message: &str, rule: fn(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(Error::new(ErrorCode::P001, token.line, token.column, message));
        }
        self.depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || rule(self));
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Kind of the token `offset` positions ahead, saturating at Eof.
    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn on_previous_line(&self) -> bool {
        self.pos > 0 && self.tokens[self.pos - 1].line == self.peek().line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("Expected {what} but found {tok}"),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        match &self.peek().kind {
            TokenKind::Ident(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Property names after `.` may be keywords: `obj.in`, `range.of`.
    fn expect_property_name(&mut self) -> Result<String, Error> {
        let tok = self.peek();
        match &tok.kind {
            TokenKind::Ident(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            k if k.is_keyword() => Ok(self.advance().text),
            _ => Err(self.unexpected("property name")),
        }
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("Expected {expected} but found {tok}"),
        )
    }

    fn error_at(&self, tok: &Token, msg: &str) -> Error {
        Error::new(ErrorCode::P001, tok.line, tok.column, msg)
    }

    /// Returns true if the `(` at the cursor opens an arrow parameter list:
    /// scans to the matching `)` and checks for a following `=>`.
    fn is_arrow_start(&self) -> bool {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(self.pos) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::FatArrow)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// Skip past the failing tokens: always advance once, then stop after a
    /// `;` or in front of a keyword that starts a statement.
    fn recover(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.advance().kind == TokenKind::Semicolon {
            return;
        }
        while !self.is_at_end() {
            if self.peek().kind.starts_statement() {
                return;
            }
            if self.advance().kind == TokenKind::Semicolon {
                return;
            }
        }
    }
}

/// Object literal keys written as numbers use the same text the runtime
/// produces when it stringifies that number.
fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parse(src: &str) -> Vec<Stmt> {
        let (tokens, lex_errors) = Lexer::new(src).tokenize();
        assert!(lex_errors.is_empty(), "lex failed: {lex_errors:?}");
        let (stmts, errors) = Parser::new(tokens).parse();
        assert!(errors.is_empty(), "parse failed: {errors:?}");
        stmts
    }

    fn parse_expr_src(src: &str) -> Expr {
        match parse(src).into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn parse_err(src: &str) -> Vec<Error> {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (_, errors) = Parser::new(tokens).parse();
        assert!(!errors.is_empty(), "expected parse error for {src:?}");
        errors
    }

    /// Fully parenthesized rendering, for asserting tree shape.
    fn sexpr(e: &Expr) -> String {
        match e {
            Expr::Number(n, _) => n.to_string(),
            Expr::Str(s, _) => format!("{s:?}"),
            Expr::Bool(b, _) => b.to_string(),
            Expr::Null(_) => "null".into(),
            Expr::Ident(n, _) => n.clone(),
            Expr::Array(items, _) => {
                format!("[{}]", items.iter().map(sexpr).collect::<Vec<_>>().join(" "))
            }
            Expr::Object(props, _) => format!(
                "{{{}}}",
                props.iter().map(|(k, v)| format!("{k}:{}", sexpr(v))).collect::<Vec<_>>().join(" ")
            ),
            Expr::Binary { left, op, right, .. } => format!("({op:?} {} {})", sexpr(left), sexpr(right)),
            Expr::Logical { left, op, right, .. } => format!("({op:?} {} {})", sexpr(left), sexpr(right)),
            Expr::Unary { op, operand, .. } => format!("({op:?} {})", sexpr(operand)),
            Expr::Call { callee, args, .. } => format!(
                "(call {}{})",
                sexpr(callee),
                args.iter().map(|a| format!(" {}", sexpr(a))).collect::<String>()
            ),
            Expr::Member { object, property, optional, .. } => {
                format!("({} {} {property})", if *optional { "?." } else { "." }, sexpr(object))
            }
            Expr::Index { object, index, .. } => format!("([] {} {})", sexpr(object), sexpr(index)),
            Expr::Ternary { condition, then_expr, else_expr, .. } => {
                format!("(? {} {} {})", sexpr(condition), sexpr(then_expr), sexpr(else_expr))
            }
            Expr::Update { op, prefix, target, .. } => {
                let fix = if *prefix { "pre" } else { "post" };
                format!("({fix}{} {})", op.symbol(), sexpr(target))
            }
            Expr::Assign { target, value, .. } => format!("(= {} {})", sexpr(target), sexpr(value)),
            Expr::CompoundAssign { target, op, value, .. } => {
                format!("({op:?}= {} {})", sexpr(target), sexpr(value))
            }
            Expr::Function(def) => format!("(fn {})", def.params.join(" ")),
        }
    }

    fn shape(src: &str) -> String {
        sexpr(&parse_expr_src(src))
    }

    // ── precedence ───────────────────────────────────────────────────────────

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(shape("1 + 2 * 3"), "(Add 1 (Mul 2 3))");
        assert_eq!(shape("(1 + 2) * 3"), "(Mul (Add 1 2) 3)");
    }

    #[test]
    fn additive_is_left_associative() {
        assert_eq!(shape("a - b - c"), "(Sub (Sub a b) c)");
    }

    #[test]
    fn logical_layers() {
        assert_eq!(shape("a || b && c"), "(Or a (And b c))");
        assert_eq!(shape("a == b && c < d"), "(And (Eq a b) (Lt c d))");
    }

    #[test]
    fn unary_layers() {
        assert_eq!(shape("-a * b"), "(Mul (Neg a) b)");
        assert_eq!(shape("!a == b"), "(Eq (Not a) b)");
        assert_eq!(shape("!!a"), "(Not (Not a))");
    }

    #[test]
    fn ternary_is_right_nested() {
        assert_eq!(shape("a ? b : c ? d : e"), "(? a b (? c d e))");
        assert_eq!(shape("x = a || b ? 1 : 2"), "(= x (? (Or a b) 1 2))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(shape("a = b = 1"), "(= a (= b 1))");
        assert_eq!(shape("a += b *= 2"), "(Add= a (Mul= b 2))");
    }

    #[test]
    fn postfix_chain() {
        assert_eq!(shape("a.b(1)[2]?.c"), "(?. ([] (call (. a b) 1) 2) c)");
    }

    #[test]
    fn keyword_property_names() {
        assert_eq!(shape("range.in"), "(. range in)");
        assert_eq!(shape("x.function"), "(. x function)");
    }

    #[test]
    fn update_forms() {
        assert_eq!(shape("i++"), "(post++ i)");
        assert_eq!(shape("--a[0]"), "(pre-- ([] a 0))");
        assert_eq!(shape("-x++"), "(Neg (post++ x))");
    }

    #[test]
    fn postfix_update_stops_at_newline() {
        let stmts = parse("a\n++b");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[1], Stmt::Expr(Expr::Update { prefix: true, .. })));
    }

    // ── literals ─────────────────────────────────────────────────────────────

    #[test]
    fn array_literal_with_trailing_comma() {
        assert_eq!(shape("[1, [2], 'x',]"), "[1 [2] \"x\"]");
        assert_eq!(shape("[]"), "[]");
    }

    #[test]
    fn object_literal_keys() {
        assert_eq!(shape("({a: 1, \"b c\": 2, 3: x, if: 4})"), "{a:1 b c:2 3:x if:4}");
    }

    #[test]
    fn object_literal_shorthand() {
        assert_eq!(shape("({a, b: 2})"), "{a:a b:2}");
    }

    #[test]
    fn object_literal_in_expression_position() {
        let stmts = parse("let o = { a: 1 }");
        match &stmts[0] {
            Stmt::VarDecl { initializer: Some(init), .. } => assert_eq!(sexpr(init), "{a:1}"),
            other => panic!("expected VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn literal_kinds() {
        assert!(matches!(parse_expr_src("null"), Expr::Null(_)));
        assert!(matches!(parse_expr_src("true"), Expr::Bool(true, _)));
        assert!(matches!(parse_expr_src("'s'"), Expr::Str(ref s, _) if s == "s"));
        assert!(matches!(parse_expr_src("2.5"), Expr::Number(n, _) if n == 2.5));
    }

    // ── functions ────────────────────────────────────────────────────────────

    #[test]
    fn arrow_with_parens() {
        match parse_expr_src("(a, b) => a + b") {
            Expr::Function(def) => {
                assert_eq!(def.params, vec!["a", "b"]);
                assert!(matches!(def.body, FunctionBody::Expr(_)));
            }
            other => panic!("expected arrow, got {other:?}"),
        }
    }

    #[test]
    fn arrow_single_bare_param() {
        match parse_expr_src("x => { return x }") {
            Expr::Function(def) => {
                assert_eq!(def.params, vec!["x"]);
                assert!(matches!(def.body, FunctionBody::Block(ref b) if b.len() == 1));
            }
            other => panic!("expected arrow, got {other:?}"),
        }
    }

    #[test]
    fn arrow_with_no_params() {
        assert_eq!(shape("() => 1"), "(fn )");
    }

    #[test]
    fn grouped_expression_is_not_arrow() {
        assert_eq!(shape("(a + (b)) * c"), "(Mul (Add a b) c)");
    }

    #[test]
    fn curried_arrows() {
        assert_eq!(shape("adder = (x) => (y) => x + y"), "(= adder (fn x))");
    }

    #[test]
    fn arrow_as_call_argument() {
        assert_eq!(shape("xs.map(x => x * 2)"), "(call (. xs map) (fn x))");
    }

    #[test]
    fn function_declaration() {
        let stmts = parse("function add(a, b) { return a + b }");
        match &stmts[0] {
            Stmt::Function(def) => {
                assert_eq!(def.name.as_deref(), Some("add"));
                assert_eq!(def.params, vec!["a", "b"]);
            }
            other => panic!("expected function decl, got {other:?}"),
        }
    }

    #[test]
    fn function_expression() {
        match parse_expr_src("(function (n) { return n })") {
            Expr::Function(def) => assert!(def.name.is_none()),
            other => panic!("expected function expression, got {other:?}"),
        }
    }

    // ── statements ───────────────────────────────────────────────────────────

    #[test]
    fn var_decls() {
        let stmts = parse("let x = 1; let y; const Z = 2");
        assert!(matches!(&stmts[0], Stmt::VarDecl { is_const: false, initializer: Some(_), .. }));
        assert!(matches!(&stmts[1], Stmt::VarDecl { initializer: None, .. }));
        assert!(matches!(&stmts[2], Stmt::VarDecl { is_const: true, .. }));
    }

    #[test]
    fn const_requires_initializer() {
        let errs = parse_err("const Z");
        assert_eq!(errs[0].code, ErrorCode::P002);
    }

    #[test]
    fn semicolons_are_optional() {
        assert_eq!(parse("let a = 1\nlet b = 2\na + b").len(), 3);
        assert_eq!(parse(";;let a = 1;;").len(), 1);
    }

    #[test]
    fn if_else_chain() {
        let stmts = parse("if (a) x = 1; else if (b) { x = 2 } else x = 3");
        match &stmts[0] {
            Stmt::If { else_branch: Some(e), .. } => {
                assert!(matches!(**e, Stmt::If { else_branch: Some(_), .. }));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn c_style_for() {
        let stmts = parse("for (let i = 0; i < 10; i++) { s += i }");
        match &stmts[0] {
            Stmt::For { init: Some(_), condition: Some(_), update: Some(_), .. } => {}
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn for_with_empty_clauses() {
        let stmts = parse("for (;;) break");
        assert!(matches!(&stmts[0], Stmt::For { init: None, condition: None, update: None, .. }));
    }

    #[test]
    fn for_with_expression_init() {
        let stmts = parse("for (i = 0; i < 3; i = i + 1) {}");
        match &stmts[0] {
            Stmt::For { init: Some(init), .. } => assert!(matches!(**init, Stmt::Expr(Expr::Assign { .. }))),
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn for_of_and_for_in() {
        let stmts = parse("for (const x of xs) {} for (let k in obj) {}");
        assert!(matches!(&stmts[0], Stmt::ForEach { kind: ForEachKind::Of, is_const: true, .. }));
        assert!(matches!(&stmts[1], Stmt::ForEach { kind: ForEachKind::In, is_const: false, .. }));
    }

    #[test]
    fn while_and_do_while() {
        let stmts = parse("while (x) x--; do { x++ } while (x < 3);");
        assert!(matches!(&stmts[0], Stmt::While { .. }));
        assert!(matches!(&stmts[1], Stmt::DoWhile { .. }));
    }

    #[test]
    fn return_forms() {
        let stmts = parse("function f() { return }");
        let Stmt::Function(def) = &stmts[0] else { panic!("expected function") };
        let FunctionBody::Block(body) = &def.body else { panic!("expected block body") };
        assert!(matches!(body[0], Stmt::Return(None, _)));

        let stmts = parse("function g() { return 1; }");
        let Stmt::Function(def) = &stmts[0] else { panic!("expected function") };
        let FunctionBody::Block(body) = &def.body else { panic!("expected block body") };
        assert!(matches!(body[0], Stmt::Return(Some(_), _)));
    }

    #[test]
    fn try_forms() {
        let stmts = parse("try { a() } catch (e) { b(e) } finally { c() }");
        assert!(matches!(&stmts[0], Stmt::Try { catch: Some(_), finally: Some(_), .. }));
        let stmts = parse("try { a() } finally { c() }");
        assert!(matches!(&stmts[0], Stmt::Try { catch: None, finally: Some(_), .. }));
    }

    #[test]
    fn throw_statement() {
        assert!(matches!(&parse("throw 'boom'")[0], Stmt::Throw(Expr::Str(..), _)));
    }

    // ── errors ───────────────────────────────────────────────────────────────

    #[test]
    fn try_without_handlers() {
        let errs = parse_err("try { a() }");
        assert_eq!(errs[0].code, ErrorCode::P004);
    }

    #[test]
    fn invalid_assignment_targets() {
        for src in ["1 = 2", "a + b = c", "f() = 1", "a?.b = 1", "(x => x) += 1"] {
            let errs = parse_err(src);
            assert_eq!(errs[0].code, ErrorCode::P003, "source {src:?}");
        }
    }

    #[test]
    fn missing_closing_paren() {
        let errs = parse_err("f(1, 2");
        assert_eq!(errs[0].code, ErrorCode::P002);
        assert!(errs[0].message.contains("')' after arguments"), "{}", errs[0].message);
    }

    #[test]
    fn unexpected_token_reports_position() {
        let errs = parse_err("let x = ;");
        assert_eq!(errs[0].code, ErrorCode::P001);
        assert_eq!((errs[0].line, errs[0].column), (1, 9));
    }

    #[test]
    fn recovery_reports_every_bad_statement() {
        let (tokens, _) = Lexer::new("let = 1; let ok = 2; let = 3\nlet fine = 4").tokenize();
        let (stmts, errors) = Parser::new(tokens).parse();
        assert_eq!(errors.len(), 2);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn recovery_stops_before_statement_keyword() {
        let (tokens, _) = Lexer::new("x = ) ) ) if (y) z = 1").tokenize();
        let (stmts, errors) = Parser::new(tokens).parse();
        assert_eq!(errors.len(), 1);
        assert!(matches!(stmts.last(), Some(Stmt::If { .. })));
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let src = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let errs = parse_err(&src);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::P001);
        assert_eq!(errs[0].message, "Expression nested too deeply");

        let errs = parse_err(&"!".repeat(50_000));
        assert_eq!(errs[0].message, "Expression nested too deeply");

        let errs = parse_err(&format!("{}x = 1;{}", "{".repeat(1_000), "}".repeat(1_000)));
        assert_eq!(errs[0].message, "Statements nested too deeply");
    }

    #[test]
    fn moderate_nesting_parses() {
        let src = format!("{}1{}", "(".repeat(60), ")".repeat(60));
        assert_eq!(parse(&src).len(), 1);
        assert_eq!(parse(&format!("{}x = 1;{}", "{".repeat(60), "}".repeat(60))).len(), 1);
    }

    #[test]
    fn parser_tolerates_missing_eof() {
        let (mut tokens, _) = Lexer::new("1 + 2").tokenize();
        tokens.pop();
        let (stmts, errors) = Parser::new(tokens).parse();
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn spans_point_at_statement_start() {
        let stmts = parse("let a = 1\n  while (a) a--");
        assert_eq!(stmts[1].span(), Span::new(2, 3));
    }
}
