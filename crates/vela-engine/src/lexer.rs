//! Lexer for the Vela language.
//!
//! Tokenization uses a logos-generated scanner. The internal logos enum is
//! converted into the public [`Token`] stream with precise source positions.
//! Newlines are significant (they terminate statements) and survive as
//! tokens; all other whitespace and `//` comments are skipped.

use crate::token::{Span, Token};
use logos::Logos;
use std::fmt;

/// Lexical error with source position.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at line {}, column {}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Logos-based token enum for scanning.
///
/// Used internally; literal payloads are parsed during conversion to the
/// public `Token` enum so malformed literals surface as `LexError`s.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LogosToken {
    // Whitespace except newlines (skip)
    #[regex(r"[ \t\r]+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("\n")]
    Newline,

    // Keywords (take precedence over identifiers)
    #[token("fn")]
    Fn,

    #[token("let")]
    Let,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("return")]
    Return,

    #[token("import")]
    Import,

    #[token("profile")]
    Profile,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Punctuation
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(";")]
    Semicolon,

    // Operators
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("==")]
    Eq,

    #[token("=")]
    Assign,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    Le,

    #[token("<")]
    Lt,

    #[token(">=")]
    Ge,

    #[token(">")]
    Gt,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// Lexer over a source string.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the entire input into `(Token, Span)` pairs.
    pub fn tokenize(&self) -> Result<Vec<(Token, Span)>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = LogosToken::lexer(self.source);
        let mut line: u32 = 1;
        let mut line_start: usize = 0;

        while let Some(result) = lex.next() {
            let range = lex.span();
            let column = (range.start - line_start + 1) as u32;
            let span = Span::new(range.start, range.end, line, column);

            let raw = match result {
                Ok(raw) => raw,
                Err(()) => {
                    return Err(LexError {
                        message: format!("unexpected character {:?}", lex.slice()),
                        span,
                    })
                }
            };

            let token = match raw {
                LogosToken::Whitespace | LogosToken::LineComment => continue,
                LogosToken::Newline => {
                    tokens.push((Token::Newline, span));
                    line += 1;
                    line_start = range.end;
                    continue;
                }
                LogosToken::Fn => Token::Fn,
                LogosToken::Let => Token::Let,
                LogosToken::If => Token::If,
                LogosToken::Else => Token::Else,
                LogosToken::While => Token::While,
                LogosToken::Break => Token::Break,
                LogosToken::Continue => Token::Continue,
                LogosToken::Return => Token::Return,
                LogosToken::Import => Token::Import,
                LogosToken::Profile => Token::Profile,
                LogosToken::True => Token::True,
                LogosToken::False => Token::False,
                LogosToken::LParen => Token::LParen,
                LogosToken::RParen => Token::RParen,
                LogosToken::LBrace => Token::LBrace,
                LogosToken::RBrace => Token::RBrace,
                LogosToken::LBracket => Token::LBracket,
                LogosToken::RBracket => Token::RBracket,
                LogosToken::Comma => Token::Comma,
                LogosToken::Dot => Token::Dot,
                LogosToken::Semicolon => Token::Semicolon,
                LogosToken::Plus => Token::Plus,
                LogosToken::Minus => Token::Minus,
                LogosToken::Star => Token::Star,
                LogosToken::Slash => Token::Slash,
                LogosToken::Percent => Token::Percent,
                LogosToken::Eq => Token::Eq,
                LogosToken::Assign => Token::Assign,
                LogosToken::NotEq => Token::NotEq,
                LogosToken::Le => Token::Le,
                LogosToken::Lt => Token::Lt,
                LogosToken::Ge => Token::Ge,
                LogosToken::Gt => Token::Gt,
                LogosToken::AndAnd => Token::AndAnd,
                LogosToken::OrOr => Token::OrOr,
                LogosToken::Bang => Token::Bang,
                LogosToken::Int => {
                    let value = lex.slice().parse::<i64>().map_err(|_| LexError {
                        message: format!("integer literal out of range: {}", lex.slice()),
                        span,
                    })?;
                    Token::Int(value)
                }
                LogosToken::Float => {
                    let value = lex.slice().parse::<f64>().map_err(|_| LexError {
                        message: format!("invalid number literal: {}", lex.slice()),
                        span,
                    })?;
                    Token::Float(value)
                }
                LogosToken::Str => Token::Str(unescape(lex.slice(), span)?),
                LogosToken::Ident => Token::Ident(lex.slice().to_string()),
            };

            tokens.push((token, span));
        }

        Ok(tokens)
    }
}

/// Strip quotes and process escape sequences of a string literal slice.
fn unescape(raw: &str, span: Span) -> Result<String, LexError> {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            other => {
                return Err(LexError {
                    message: format!(
                        "unsupported escape sequence '\\{}'",
                        other.map(String::from).unwrap_or_default()
                    ),
                    span,
                })
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
