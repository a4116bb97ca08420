//! Query Lexer
//!
//! Turns query source text into a flat stream of [tokens](Token) ending in
//! [`TokenKind::Eof`]. Individual lexemes are recognised with `nom`; the lexer
//! itself walks the input and keeps the line/column bookkeeping.
//!
//! Whitespace and `//` line comments are skipped. Quoted strings in
//! `YYYY-MM-DD` form are emitted as [`TokenKind::Date`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    sequence::pair,
    IResult,
};
use regex::Regex;
use std::sync::OnceLock;

use crate::query::error::LexError;
use crate::query::token::{ComparisonOp, Keyword, Position, Token, TokenKind};

/// Tokenize a query string
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

/// Whether a string is a `YYYY-MM-DD` date literal
///
/// Only the shape is checked here; calendar validity is checked when the
/// value is interpreted.
pub fn is_date_literal(value: &str) -> bool {
    static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();
    DATE_PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
        .is_match(value)
}

/// Query tokenizer
pub struct Lexer<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            rest: source,
            line: 1,
            column: 1,
        }
    }

    /// Consume the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            if self.rest.is_empty() {
                tokens.push(Token::new(TokenKind::Eof, "", self.position()));
                break;
            }
            tokens.push(self.next_token()?);
        }

        tracing::trace!(count = tokens.len(), "Tokenized query");
        Ok(tokens)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Advance over `len` bytes, updating line and column
    fn bump(&mut self, len: usize) -> &'a str {
        let (taken, rest) = self.rest.split_at(len);
        for ch in taken.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.rest = rest;
        taken
    }

    fn skip_trivia(&mut self) {
        loop {
            let whitespace: IResult<&str, &str> = take_while1(|c: char| c.is_whitespace())(self.rest);
            if let Ok((_, ws)) = whitespace {
                self.bump(ws.len());
                continue;
            }

            if self.rest.starts_with("//") {
                let end = self.rest.find('\n').unwrap_or(self.rest.len());
                self.bump(end);
                continue;
            }

            break;
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        let Some(c) = self.rest.chars().next() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };

        match c {
            '"' | '\'' => self.lex_string(c, start),
            ',' => Ok(self.single(TokenKind::Comma, start)),
            '(' => Ok(self.single(TokenKind::LeftParen, start)),
            ')' => Ok(self.single(TokenKind::RightParen, start)),
            '=' | '!' | '<' | '>' => self.lex_operator(c, start),
            c if c.is_ascii_digit() => self.lex_number(start),
            c if c.is_alphabetic() || c == '_' => self.lex_word(start),
            other => Err(unexpected(other, start)),
        }
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Token {
        let text = self.bump(1);
        Token::new(kind, text, start)
    }

    fn lex_operator(&mut self, first: char, start: Position) -> Result<Token, LexError> {
        let parsed: IResult<&str, &str> = alt((
            tag(">="),
            tag("<="),
            tag("!="),
            tag("="),
            tag(">"),
            tag("<"),
        ))(self.rest);

        let symbol = match parsed {
            Ok((_, symbol)) => symbol,
            Err(_) => return Err(unexpected(first, start)),
        };
        let op = ComparisonOp::from_symbol(symbol).ok_or_else(|| unexpected(first, start))?;
        let text = self.bump(symbol.len());
        Ok(Token::new(TokenKind::Operator(op), text, start))
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let parsed: IResult<&str, (&str, Option<char>)> = pair(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            opt(char('%')),
        )(self.rest);

        let (digits, percent) = match parsed {
            Ok((_, parts)) => parts,
            Err(_) => return Err(LexError::new("Invalid number", start)),
        };
        let value: f64 = digits
            .parse()
            .map_err(|_| LexError::new(format!("Invalid number '{}'", digits), start))?;

        let len = digits.len() + percent.map_or(0, |_| 1);
        let text = self.bump(len);
        let kind = match percent {
            Some(_) => TokenKind::Percentage(value),
            None => TokenKind::Number(value),
        };
        Ok(Token::new(kind, text, start))
    }

    fn lex_word(&mut self, start: Position) -> Result<Token, LexError> {
        let parsed: IResult<&str, &str> = recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
        ))(self.rest);

        let word = match parsed {
            Ok((_, word)) => word,
            Err(_) => return Err(LexError::new("Invalid identifier", start)),
        };
        let text = self.bump(word.len());
        let kind = match Keyword::lookup(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text.to_string()),
        };
        Ok(Token::new(kind, text, start))
    }

    /// Lex a quoted string; errors point at the opening quote
    fn lex_string(&mut self, quote: char, start: Position) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut closed_at = None;
        let mut chars = self.rest.char_indices().skip(1);

        while let Some((i, ch)) = chars.next() {
            if ch == quote {
                closed_at = Some(i + ch.len_utf8());
                break;
            }
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped @ ('\\' | '"' | '\''))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            }
        }

        let Some(len) = closed_at else {
            return Err(LexError::new("Unterminated string", start));
        };

        let text = self.bump(len);
        let kind = if is_date_literal(&value) {
            TokenKind::Date(value)
        } else {
            TokenKind::String(value)
        };
        Ok(Token::new(kind, text, start))
    }
}

fn unexpected(ch: char, at: Position) -> LexError {
    LexError::new(format!("Unexpected character '{}'", ch), at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_simple_where() {
        assert_eq!(
            kinds("WHERE year = 2024"),
            vec![
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Identifier("year".to_string()),
                TokenKind::Operator(ComparisonOp::Eq),
                TokenKind::Number(2024.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_only_eof() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eof());
        assert_eq!(tokens[0].position(), Position::start());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("where Show vIeW"),
            vec![
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Keyword(Keyword::Show),
                TokenKind::Keyword(Keyword::View),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_all_operators() {
        assert_eq!(
            kinds("= != < > <= >="),
            vec![
                TokenKind::Operator(ComparisonOp::Eq),
                TokenKind::Operator(ComparisonOp::Ne),
                TokenKind::Operator(ComparisonOp::Lt),
                TokenKind::Operator(ComparisonOp::Gt),
                TokenKind::Operator(ComparisonOp::Lte),
                TokenKind::Operator(ComparisonOp::Gte),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_percentages() {
        assert_eq!(
            kinds("40 7.5 75%"),
            vec![
                TokenKind::Number(40.0),
                TokenKind::Number(7.5),
                TokenKind::Percentage(75.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_date_is_date_token() {
        assert_eq!(
            kinds(r#""2024-01-01" '2024-12-31' "2024-1-1""#),
            vec![
                TokenKind::Date("2024-01-01".to_string()),
                TokenKind::Date("2024-12-31".to_string()),
                TokenKind::String("2024-1-1".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n\ttab\\" 'it\'s'"#),
            vec![
                TokenKind::String("say \"hi\"\n\ttab\\".to_string()),
                TokenKind::String("it's".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_hyphenated_identifiers() {
        assert_eq!(
            kinds("PERIOD last-6-months"),
            vec![
                TokenKind::Keyword(Keyword::Period),
                TokenKind::Identifier("last-6-months".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "// report for the client\nSHOW hours // trailing\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Keyword(Keyword::Show),
                TokenKind::Identifier("hours".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_across_lines() {
        let tokens = tokenize("WHERE year = 2024\n  AND month = 3").unwrap();
        let and = tokens.iter().find(|t| t.is_keyword(Keyword::And)).unwrap();
        assert_eq!((and.line, and.column), (2, 3));

        let three = &tokens[tokens.len() - 2];
        assert_eq!(three.kind, TokenKind::Number(3.0));
        assert_eq!((three.line, three.column), (2, 15));
    }

    #[test]
    fn test_token_text_is_raw_lexeme() {
        let tokens = tokenize(r#"where project = "a\"b""#).unwrap();
        assert_eq!(tokens[0].text, "where");
        assert_eq!(tokens[3].text, r#""a\"b""#);
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        let err = tokenize(r#"WHERE project = "abc"#).unwrap_err();
        assert_eq!(err.message, "Unterminated string");
        assert_eq!((err.line, err.column), (1, 17));
    }

    #[test]
    fn test_unterminated_string_on_later_line() {
        let err = tokenize("SHOW hours\nWHERE project = 'abc").unwrap_err();
        assert_eq!((err.line, err.column), (2, 17));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("SHOW hours @").unwrap_err();
        assert_eq!(err.message, "Unexpected character '@'");
        assert_eq!((err.line, err.column), (1, 12));
    }

    #[test]
    fn test_lone_bang_is_an_error() {
        let err = tokenize("WHERE year ! 2024").unwrap_err();
        assert_eq!(err.message, "Unexpected character '!'");
        assert_eq!(err.column, 12);
    }

    #[test]
    fn test_is_date_literal() {
        assert!(is_date_literal("2024-02-29"));
        assert!(!is_date_literal("2024-02-29T00:00"));
        assert!(!is_date_literal("24-02-29"));
    }
}
