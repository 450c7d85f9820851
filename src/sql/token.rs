//! # Token Definitions
//!
//! Tokens produced by the lexer. The dialect is small: identifiers,
//! double-quoted string literals, a dozen keywords, and the punctuation
//! of parenthesized lists.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Create,
    Table,
    Index,
    On,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    And,
    Update,
    Delete,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare identifier: table or column name.
    Ident(String),
    /// Double-quoted string literal, quotes stripped.
    Str(String),
    Keyword(Keyword),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Asterisk,
    Equals,
    /// A byte the lexer has no rule for.
    Illegal(char),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Keyword(k) => write!(f, "{:?}", k),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Asterisk => write!(f, "*"),
            Token::Equals => write!(f, "="),
            Token::Illegal(c) => write!(f, "illegal character '{}'", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
