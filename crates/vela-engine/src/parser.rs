//! Parser for the Vela language.
//!
//! A recursive descent parser over the token stream from the lexer.
//! Statements are terminated by a newline, a `;`, a closing `}`, or end of
//! input. Blocks are brace-delimited and may span multiple lines.

use crate::ast::*;
use crate::lexer::{LexError, Lexer};
use crate::token::{Span, Token};
use std::fmt;

/// Parse error with source position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parser state.
pub struct Parser {
    /// Pre-tokenized input, always ending in `Token::Eof`.
    tokens: Vec<(Token, Span)>,
    /// Current position in the token stream.
    pos: usize,
}

impl Parser {
    /// Create a new parser from source code.
    pub fn new(source: &str) -> Result<Self, LexError> {
        let mut tokens = Lexer::new(source).tokenize()?;

        let eof_span = tokens
            .last()
            .map(|(_, s)| Span::new(s.end, s.end, s.line, s.column))
            .unwrap_or_else(|| Span::new(0, 0, 1, 1));
        tokens.push((Token::Eof, eof_span));

        Ok(Self { tokens, pos: 0 })
    }

    /// Parse the entire source into a [`Program`].
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at(&Token::Eof) {
            if self.eat(&Token::Semicolon) {
                self.skip_newlines();
                continue;
            }
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current_span().line;
        match self.current() {
            Token::Import => {
                self.advance();
                let path = self.parse_module_path()?;
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Import { path },
                    line,
                })
            }
            Token::Fn => self.parse_function(line),
            Token::Let => {
                self.advance();
                let name = self.expect_ident("variable name")?;
                self.expect(&Token::Assign, "'='")?;
                let value = self.parse_expr()?;
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Let { name, value },
                    line,
                })
            }
            Token::If => self.parse_if(line),
            Token::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::While { cond, body },
                    line,
                })
            }
            Token::Profile => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Profile { body },
                    line,
                })
            }
            Token::Return => {
                self.advance();
                let value = if self.at_terminator() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Return { value },
                    line,
                })
            }
            Token::Break => {
                self.advance();
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    line,
                })
            }
            Token::Continue => {
                self.advance();
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    line,
                })
            }
            Token::Ident(_) if matches!(self.peek_next(), Token::Assign) => {
                let name = self.expect_ident("variable name")?;
                self.advance(); // '='
                let value = self.parse_expr()?;
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Assign { name, value },
                    line,
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_terminator()?;
                Ok(Stmt {
                    kind: StmtKind::Expr { expr },
                    line,
                })
            }
        }
    }

    fn parse_function(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance(); // 'fn'
        let name = self.expect_ident("function name")?;
        self.expect(&Token::LParen, "'('")?;
        self.skip_newlines();

        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                self.skip_newlines();
                if !self.eat(&Token::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.expect(&Token::RParen, "')'")?;

        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::Function { name, params, body },
            line,
        })
    }

    fn parse_if(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance(); // 'if'
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;

        let mut else_body = None;
        if matches!(self.next_meaningful(), Token::Else) {
            self.skip_newlines();
            self.advance(); // 'else'
            if self.at(&Token::If) {
                let nested_line = self.current_span().line;
                else_body = Some(vec![self.parse_if(nested_line)?]);
            } else {
                else_body = Some(self.parse_block()?);
            }
        }

        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_body,
                else_body,
            },
            line,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        self.skip_newlines();

        let mut body = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.at(&Token::Eof) {
                return Err(self.error_here("unexpected end of input; expected '}'"));
            }
            if self.eat(&Token::Semicolon) {
                self.skip_newlines();
                continue;
            }
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.advance(); // '}'
        Ok(body)
    }

    fn parse_module_path(&mut self) -> Result<String, ParseError> {
        let mut path = self.expect_ident("module name")?;
        while self.eat(&Token::Dot) {
            path.push('.');
            path.push_str(&self.expect_ident("module name")?);
        }
        Ok(path)
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let line = self.current_span().line;
        let op = match self.current() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at(&Token::LParen) {
                self.advance();
                let args = self.parse_call_args()?;
                let line = expr.line;
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    line,
                };
            } else if self.at(&Token::LBracket) {
                self.advance();
                self.skip_newlines();
                let index = self.parse_expr()?;
                self.skip_newlines();
                self.expect(&Token::RBracket, "']'")?;
                let line = expr.line;
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                };
            } else if self.at(&Token::Dot) {
                self.advance();
                let field = self.expect_ident("member name")?;
                let line = expr.line;
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        field,
                    },
                    line,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.skip_newlines();
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            self.skip_newlines();
            if self.eat(&Token::Comma) {
                self.skip_newlines();
                if self.eat(&Token::RParen) {
                    break;
                }
                continue;
            }
            self.expect(&Token::RParen, "')'")?;
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.current_span().line;
        let kind = match self.current().clone() {
            Token::Int(value) => {
                self.advance();
                ExprKind::Int(value)
            }
            Token::Float(value) => {
                self.advance();
                ExprKind::Float(value)
            }
            Token::Str(value) => {
                self.advance();
                ExprKind::Str(value)
            }
            Token::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            Token::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            Token::Ident(name) => {
                self.advance();
                ExprKind::Ident(name)
            }
            Token::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expr()?;
                self.skip_newlines();
                self.expect(&Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.advance();
                self.skip_newlines();
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        self.skip_newlines();
                        if self.eat(&Token::Comma) {
                            self.skip_newlines();
                            if self.eat(&Token::RBracket) {
                                break;
                            }
                            continue;
                        }
                        self.expect(&Token::RBracket, "']'")?;
                        break;
                    }
                }
                ExprKind::Array(items)
            }
            other => {
                return Err(self.error_here(format!(
                    "expected expression, found {}",
                    other.describe()
                )))
            }
        };
        Ok(Expr { kind, line })
    }

    // ── Token cursor helpers ─────────────────────────────────────────

    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn peek_next(&self) -> &Token {
        let next = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[next].0
    }

    /// Next token after any run of newlines, without consuming anything.
    fn next_meaningful(&self) -> &Token {
        let mut i = self.pos;
        while matches!(self.tokens[i].0, Token::Newline) {
            i += 1;
        }
        &self.tokens[i].0
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected {}, found {}",
                what,
                self.current().describe()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!(
                "expected {}, found {}",
                what,
                other.describe()
            ))),
        }
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.current(),
            Token::Newline | Token::Semicolon | Token::RBrace | Token::Eof
        )
    }

    fn expect_terminator(&mut self) -> Result<(), ParseError> {
        match self.current() {
            Token::Newline | Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::RBrace | Token::Eof => Ok(()),
            other => Err(self.error_here(format!(
                "expected end of statement, found {}",
                other.describe()
            ))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&Token::Newline) {
            self.advance();
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            span: self.current_span(),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let line = left.line;
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        line,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source)
            .expect("lex failed")
            .parse()
            .expect("parse failed")
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source)
            .expect("lex failed")
            .parse()
            .expect_err("expected parse error")
    }

    #[test]
    fn test_expression_statement_lines() {
        let program = parse("print(1+1)\n\nprint(2)");
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].line, 1);
        assert_eq!(program.statements[1].line, 3);
    }

    #[test]
    fn test_function_declaration() {
        let program = parse("fn add(a, b) {\n    return a + b\n}");
        match &program.statements[0].kind {
            StmtKind::Function { name, params, body } => {
                assert_eq!(name, "add");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_main_guard_shape() {
        let program = parse("if MODULE == \"main\" {\n    main()\n}");
        match &program.statements[0].kind {
            StmtKind::If {
                cond, then_body, ..
            } => {
                assert!(matches!(
                    cond.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Eq,
                        ..
                    }
                ));
                assert_eq!(then_body.len(), 1);
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_else_if_chain() {
        let program = parse("if a {\n    x()\n} else if b {\n    y()\n} else {\n    z()\n}");
        match &program.statements[0].kind {
            StmtKind::If { else_body, .. } => {
                let else_body = else_body.as_ref().expect("missing else");
                assert!(matches!(else_body[0].kind, StmtKind::If { .. }));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_block() {
        let program = parse("profile {\n    print(1)\n    print(2)\n}");
        match &program.statements[0].kind {
            StmtKind::Profile { body } => {
                assert_eq!(body.len(), 2);
                assert_eq!(body[0].line, 2);
                assert_eq!(body[1].line, 3);
            }
            other => panic!("expected profile block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_profile_block() {
        let program = parse("profile {\n}");
        assert!(matches!(
            program.statements[0].kind,
            StmtKind::Profile { ref body } if body.is_empty()
        ));
    }

    #[test]
    fn test_dotted_import() {
        let program = parse("import pkg.mod");
        assert_eq!(
            program.statements[0].kind,
            StmtKind::Import {
                path: "pkg.mod".to_string()
            }
        );
    }

    #[test]
    fn test_member_call() {
        let program = parse("profiler.shift_lines(2)");
        match &program.statements[0].kind {
            StmtKind::Expr { expr } => match &expr.kind {
                ExprKind::Call { callee, args } => {
                    assert!(matches!(callee.kind, ExprKind::Member { .. }));
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_index_and_array_literal() {
        let program = parse("let x = [1, 2, 3]\nprint(x[0])");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StmtKind::Let { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Array(ref items) if items.len() == 3));
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_semicolon_separates_statements() {
        let program = parse("let a = 1; print(a)");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_precedence() {
        let program = parse("let x = 1 + 2 * 3");
        match &program.statements[0].kind {
            StmtKind::Let { value, .. } => match &value.kind {
                ExprKind::Binary {
                    op: BinaryOp::Add,
                    right,
                    ..
                } => {
                    assert!(matches!(
                        right.kind,
                        ExprKind::Binary {
                            op: BinaryOp::Mul,
                            ..
                        }
                    ));
                }
                other => panic!("expected addition at the top, got {:?}", other),
            },
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_terminator_is_an_error() {
        let err = parse_err("let a = 1 let b = 2");
        assert!(err.message.contains("expected end of statement"));
    }

    #[test]
    fn test_unclosed_block_is_an_error() {
        let err = parse_err("while true {\n    print(1)\n");
        assert!(err.message.contains("expected '}'"));
    }
}
