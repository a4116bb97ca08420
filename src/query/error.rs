//! Query error types
//!
//! Defines all error conditions that can occur while compiling a query:
//! lexing, parsing, validation and interpretation.

use crate::query::ast::ClauseType;
use crate::query::token::Position;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A lexical error: unterminated string or unrecognized character
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message} at line {line}, column {column}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// A syntax error with an optional "expected X, found Y" hint
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            line: position.line,
            column: position.column,
            expected: None,
            found: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.message, self.line, self.column)?;
        match (&self.expected, &self.found) {
            (Some(expected), Some(found)) => write!(f, " (expected {}, found {})", expected, found),
            (Some(expected), None) => write!(f, " (expected {})", expected),
            (None, Some(found)) => write!(f, " (found {})", found),
            (None, None) => Ok(()),
        }
    }
}

/// Errors that can occur during query compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Tokenizing failed
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Query parsing failed
    #[error("Syntax error: {0}")]
    Parse(#[from] ParseError),

    /// The AST failed validation; one message per problem
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A WHERE or HAVING condition cannot be interpreted
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// A clause value is out of range or of the wrong type
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// No handler is registered for a clause type
    #[error("Unknown clause type: {0}")]
    UnknownClause(ClauseType),
}

impl QueryError {
    /// Source position, for errors that carry one
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Lex(e) => Some(e.position()),
            Self::Parse(e) => Some(e.position()),
            _ => None,
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
