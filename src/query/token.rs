//! Lexical tokens
//!
//! Tokens produced by the [lexer](super::lexer) and consumed by the parser.
//! Every token records the 1-based line and column of its first character.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in the query source (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position of the first character of a source
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Reserved words of the query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Keyword {
    Where,
    Show,
    View,
    Chart,
    Period,
    Size,
    Between,
    And,
    Or,
    In,
    Not,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    As,
    Format,
    Target,
    Retainer,
    Utilization,
    Rollover,
}

impl Keyword {
    /// Look up a keyword, ignoring case
    pub fn lookup(word: &str) -> Option<Self> {
        Some(match word.to_ascii_uppercase().as_str() {
            "WHERE" => Self::Where,
            "SHOW" => Self::Show,
            "VIEW" => Self::View,
            "CHART" => Self::Chart,
            "PERIOD" => Self::Period,
            "SIZE" => Self::Size,
            "BETWEEN" => Self::Between,
            "AND" => Self::And,
            "OR" => Self::Or,
            "IN" => Self::In,
            "NOT" => Self::Not,
            "GROUP" => Self::Group,
            "BY" => Self::By,
            "HAVING" => Self::Having,
            "ORDER" => Self::Order,
            "ASC" => Self::Asc,
            "DESC" => Self::Desc,
            "LIMIT" => Self::Limit,
            "AS" => Self::As,
            "FORMAT" => Self::Format,
            "TARGET" => Self::Target,
            "RETAINER" => Self::Retainer,
            "UTILIZATION" => Self::Utilization,
            "ROLLOVER" => Self::Rollover,
            _ => return None,
        })
    }

    /// Canonical (upper case) spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::Show => "SHOW",
            Self::View => "VIEW",
            Self::Chart => "CHART",
            Self::Period => "PERIOD",
            Self::Size => "SIZE",
            Self::Between => "BETWEEN",
            Self::And => "AND",
            Self::Or => "OR",
            Self::In => "IN",
            Self::Not => "NOT",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Having => "HAVING",
            Self::Order => "ORDER",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Limit => "LIMIT",
            Self::As => "AS",
            Self::Format => "FORMAT",
            Self::Target => "TARGET",
            Self::Retainer => "RETAINER",
            Self::Utilization => "UTILIZATION",
            Self::Rollover => "ROLLOVER",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equal to
    #[serde(rename = "=")]
    Eq,
    /// Not equal to
    #[serde(rename = "!=")]
    Ne,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal to
    #[serde(rename = ">=")]
    Gte,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal to
    #[serde(rename = "<=")]
    Lte,
}

/// Relative tolerance for `=` and `!=` on numbers
pub const EQ_TOLERANCE: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EQ_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

impl ComparisonOp {
    /// Parse from string
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Compare two f64 values
    ///
    /// Equality allows a relative error of [`EQ_TOLERANCE`] so that summed
    /// hours and amounts still match the literal they are compared with.
    pub fn compare_f64(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Eq => approx_eq(a, b),
            Self::Ne => !approx_eq(a, b),
            Self::Gt => a > b,
            Self::Gte => a >= b,
            Self::Lt => a < b,
            Self::Lte => a <= b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a token, carrying its decoded payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    /// Quoted string with escapes resolved
    String(String),
    /// Quoted string in `YYYY-MM-DD` form
    Date(String),
    Number(f64),
    /// Number written with a trailing `%`; the value is as written (`75%` is 75.0)
    Percentage(f64),
    Operator(ComparisonOp),
    Comma,
    LeftParen,
    RightParen,
    Eof,
}

impl TokenKind {
    /// Short human-readable description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Keyword(k) => format!("keyword {}", k),
            Self::Identifier(name) => format!("identifier '{}'", name),
            Self::String(s) => format!("string \"{}\"", s),
            Self::Date(d) => format!("date \"{}\"", d),
            Self::Number(n) => format!("number {}", n),
            Self::Percentage(p) => format!("percentage {}%", p),
            Self::Operator(op) => format!("operator '{}'", op),
            Self::Comma => "','".to_string(),
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

/// A single lexical token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the lexeme
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == keyword)
    }

    /// The word this token spells, for identifiers and keywords
    ///
    /// Clause values such as `VIEW chart` or `SHOW utilization` collide with
    /// reserved words, so value positions accept either kind.
    pub fn as_word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::Keyword(_) => Some(&self.text),
            _ => None,
        }
    }

    /// Snippet shown as the "found" part of a syntax error
    pub fn snippet(&self) -> String {
        if self.is_eof() {
            "end of input".to_string()
        } else {
            self.text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("where"), Some(Keyword::Where));
        assert_eq!(Keyword::lookup("WhErE"), Some(Keyword::Where));
        assert_eq!(Keyword::lookup("utilization"), Some(Keyword::Utilization));
        assert_eq!(Keyword::lookup("hours"), None);
    }

    #[test]
    fn test_comparison_op_symbols() {
        for op in [
            ComparisonOp::Eq,
            ComparisonOp::Ne,
            ComparisonOp::Gt,
            ComparisonOp::Gte,
            ComparisonOp::Lt,
            ComparisonOp::Lte,
        ] {
            assert_eq!(ComparisonOp::from_symbol(op.as_str()), Some(op));
        }
        assert_eq!(ComparisonOp::from_symbol("=="), None);
    }

    #[test]
    fn test_operator_compare() {
        assert!(ComparisonOp::Eq.compare_f64(5.0, 5.0));
        assert!(!ComparisonOp::Gt.compare_f64(5.0, 5.0));
        assert!(ComparisonOp::Gte.compare_f64(5.0, 5.0));
        assert!(ComparisonOp::Ne.compare_f64(4.0, 5.0));
    }

    #[test]
    fn test_equality_tolerates_rounding() {
        let tenths: f64 = (0..10).map(|_| 0.1).sum();
        assert!(ComparisonOp::Eq.compare_f64(tenths, 1.0));
        assert!(ComparisonOp::Eq.compare_f64(0.1 + 0.2, 0.3));
        assert!(!ComparisonOp::Ne.compare_f64(0.1 + 0.2, 0.3));
        assert!(ComparisonOp::Eq.compare_f64(1_000_000.1 + 0.2, 1_000_000.3));

        assert!(!ComparisonOp::Eq.compare_f64(100.0, 100.001));
        assert!(ComparisonOp::Ne.compare_f64(1_000_000.0, 1_000_000.01));
    }

    #[test]
    fn test_token_word() {
        let token = Token::new(TokenKind::Keyword(Keyword::Chart), "chart", Position::start());
        assert_eq!(token.as_word(), Some("chart"));

        let token = Token::new(TokenKind::Comma, ",", Position::start());
        assert_eq!(token.as_word(), None);
    }
}
