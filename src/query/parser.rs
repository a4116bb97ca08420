//! Query Parser
//!
//! Recursive-descent parser over the token stream produced by the
//! [lexer](super::lexer). Each grammar production is one method returning a
//! typed AST node.
//!
//! # Supported Syntax
//!
//! ```text
//! WHERE field op value [AND ...]
//! WHERE date BETWEEN "2024-01-01" AND "2024-12-31"
//! WHERE project [NOT] IN ("A", "B")
//! SHOW field [AS alias] [FORMAT kind], SUM(field), ...
//! VIEW summary|chart|table|full|retainer
//! CHART trend|monthly|budget|utilization|burndown
//! PERIOD current-year|all-time|last-6-months|last-12-months|last-3-months|current-month
//! SIZE compact|normal|detailed
//! GROUP BY field, ...
//! HAVING SUM(field) op value [AND ...]
//! ORDER BY field [ASC|DESC], ...
//! LIMIT n
//! RETAINER health|status|forecast|usage [TARGET value]
//! UTILIZATION current|trend|breakdown [TARGET value]
//! ROLLOVER status|history|forecast [TARGET value]
//! ```
//!
//! Clause keywords are matched in the order listed. Once a keyword is seen
//! the parser commits to that clause; there is no backtracking.

use crate::columns::FormatKind;
use crate::query::ast::*;
use crate::query::error::{ParseError, QueryResult};
use crate::query::lexer::tokenize;
use crate::query::options::{
    AggregationFunc, ChartType, Period, RetainerAnalysis, RolloverMode, SizeMode, SortDirection,
    UtilizationMode, ViewMode,
};
use crate::query::token::{Keyword, Position, Token, TokenKind};

type ParseResult<T> = Result<T, ParseError>;

/// Parse a query string into a Query AST
pub fn parse_query(input: &str) -> QueryResult<Query> {
    let tokens = tokenize(input)?;
    let query = Parser::new(tokens).parse()?;
    tracing::debug!(clauses = query.clauses.len(), "Parsed query");
    Ok(query)
}

/// Parser state: a token vector and a cursor
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a parser; a trailing end-of-input token is added if missing
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let at = tokens
                .last()
                .map(|t| Position::new(t.line, t.column + t.text.chars().count()))
                .unwrap_or_else(Position::start);
            tokens.push(Token::new(TokenKind::Eof, "", at));
        }
        Self { tokens, pos: 0 }
    }

    /// `Query ::= Clause* EOF`
    pub fn parse(mut self) -> ParseResult<Query> {
        let mut clauses = Vec::new();
        while !self.peek().is_eof() {
            clauses.push(self.parse_clause()?);
        }
        Ok(Query::new(clauses))
    }

    fn parse_clause(&mut self) -> ParseResult<Clause> {
        let token = self.peek();
        let keyword = match token.kind {
            TokenKind::Keyword(k) => k,
            _ => return Err(self.unexpected("Unexpected token", "a clause keyword")),
        };

        match keyword {
            Keyword::Where => self.parse_where().map(Clause::Where),
            Keyword::Show => self.parse_show().map(Clause::Show),
            Keyword::View => self.parse_view().map(Clause::View),
            Keyword::Chart => self.parse_chart().map(Clause::Chart),
            Keyword::Period => self.parse_period().map(Clause::Period),
            Keyword::Size => self.parse_size().map(Clause::Size),
            Keyword::Group => self.parse_group_by().map(Clause::GroupBy),
            Keyword::Having => self.parse_having().map(Clause::Having),
            Keyword::Order => self.parse_order_by().map(Clause::OrderBy),
            Keyword::Limit => self.parse_limit().map(Clause::Limit),
            Keyword::Retainer => self.parse_retainer().map(Clause::Retainer),
            Keyword::Utilization => self.parse_utilization().map(Clause::Utilization),
            Keyword::Rollover => self.parse_rollover().map(Clause::Rollover),
            Keyword::Or => Err(self.or_not_supported()),
            _ => Err(self.unexpected("Unexpected keyword", "a clause keyword")),
        }
    }

    // ----- clauses -----

    /// `WHERE Condition (AND Condition)*`
    fn parse_where(&mut self) -> ParseResult<WhereClause> {
        let position = self.expect_keyword(Keyword::Where)?.position();
        let condition = self.parse_conditions()?;
        Ok(WhereClause { condition, position })
    }

    /// `HAVING Condition (AND Condition)*`
    fn parse_having(&mut self) -> ParseResult<HavingClause> {
        let position = self.expect_keyword(Keyword::Having)?.position();
        let condition = self.parse_conditions()?;
        Ok(HavingClause { condition, position })
    }

    /// `SHOW ShowField ("," ShowField)*`
    fn parse_show(&mut self) -> ParseResult<ShowClause> {
        let position = self.expect_keyword(Keyword::Show)?.position();
        let mut fields = vec![self.parse_show_field()?];
        while self.eat(&TokenKind::Comma) {
            fields.push(self.parse_show_field()?);
        }
        Ok(ShowClause { fields, position })
    }

    /// `Operand ("AS" alias)? ("FORMAT" kind)?`
    fn parse_show_field(&mut self) -> ParseResult<ShowField> {
        let expr = self.parse_operand()?;

        let alias = if self.eat_keyword(Keyword::As) {
            let token = self.peek();
            let alias = match &token.kind {
                TokenKind::String(s) | TokenKind::Date(s) => s.clone(),
                _ => match token.as_word() {
                    Some(word) => word.to_string(),
                    None => return Err(self.unexpected("Expected alias", "a name or quoted string")),
                },
            };
            self.advance();
            Some(alias)
        } else {
            None
        };

        let format = if self.eat_keyword(Keyword::Format) {
            Some(self.parse_option(FormatKind::from_name, FormatKind::NAMES, "format")?.0)
        } else {
            None
        };

        Ok(ShowField { expr, alias, format })
    }

    fn parse_view(&mut self) -> ParseResult<ViewClause> {
        let position = self.expect_keyword(Keyword::View)?.position();
        let (mode, _) = self.parse_option(ViewMode::from_name, ViewMode::NAMES, "view mode")?;
        Ok(ViewClause { mode, position })
    }

    fn parse_chart(&mut self) -> ParseResult<ChartClause> {
        let position = self.expect_keyword(Keyword::Chart)?.position();
        let (chart, _) = self.parse_option(ChartType::from_name, ChartType::NAMES, "chart type")?;
        Ok(ChartClause { chart, position })
    }

    fn parse_period(&mut self) -> ParseResult<PeriodClause> {
        let position = self.expect_keyword(Keyword::Period)?.position();
        let (period, _) = self.parse_option(Period::from_name, Period::NAMES, "period")?;
        Ok(PeriodClause { period, position })
    }

    fn parse_size(&mut self) -> ParseResult<SizeClause> {
        let position = self.expect_keyword(Keyword::Size)?.position();
        let (size, _) = self.parse_option(SizeMode::from_name, SizeMode::NAMES, "size")?;
        Ok(SizeClause { size, position })
    }

    /// `GROUP BY Field ("," Field)*`
    fn parse_group_by(&mut self) -> ParseResult<GroupByClause> {
        let position = self.expect_keyword(Keyword::Group)?.position();
        self.expect_keyword(Keyword::By)?;

        let mut fields = vec![self.parse_field()?];
        while self.eat(&TokenKind::Comma) {
            fields.push(self.parse_field()?);
        }
        Ok(GroupByClause { fields, position })
    }

    /// `ORDER BY Field (ASC|DESC)? ("," ...)*`
    fn parse_order_by(&mut self) -> ParseResult<OrderByClause> {
        let position = self.expect_keyword(Keyword::Order)?.position();
        self.expect_keyword(Keyword::By)?;

        let mut items = vec![self.parse_order_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_order_item()?);
        }
        Ok(OrderByClause { items, position })
    }

    fn parse_order_item(&mut self) -> ParseResult<OrderItem> {
        let field = self.parse_field()?;
        let direction = if self.eat_keyword(Keyword::Desc) {
            SortDirection::Desc
        } else {
            self.eat_keyword(Keyword::Asc);
            SortDirection::Asc
        };
        Ok(OrderItem { field, direction })
    }

    /// `LIMIT Number`
    fn parse_limit(&mut self) -> ParseResult<LimitClause> {
        let position = self.expect_keyword(Keyword::Limit)?.position();
        match self.peek().kind {
            TokenKind::Number(n) => {
                let count = Literal::number(n, self.peek().position());
                self.advance();
                Ok(LimitClause { count, position })
            }
            _ => Err(self.unexpected("Expected row limit", "a number")),
        }
    }

    fn parse_retainer(&mut self) -> ParseResult<RetainerClause> {
        let position = self.expect_keyword(Keyword::Retainer)?.position();
        let (analysis, _) =
            self.parse_option(RetainerAnalysis::from_name, RetainerAnalysis::NAMES, "retainer analysis")?;
        let target = self.parse_target()?;
        Ok(RetainerClause {
            analysis,
            target,
            position,
        })
    }

    fn parse_utilization(&mut self) -> ParseResult<UtilizationClause> {
        let position = self.expect_keyword(Keyword::Utilization)?.position();
        let (mode, _) =
            self.parse_option(UtilizationMode::from_name, UtilizationMode::NAMES, "utilization mode")?;
        let target = self.parse_target()?;
        Ok(UtilizationClause {
            mode,
            target,
            position,
        })
    }

    fn parse_rollover(&mut self) -> ParseResult<RolloverClause> {
        let position = self.expect_keyword(Keyword::Rollover)?.position();
        let (mode, _) = self.parse_option(RolloverMode::from_name, RolloverMode::NAMES, "rollover mode")?;
        let target = self.parse_target()?;
        Ok(RolloverClause {
            mode,
            target,
            position,
        })
    }

    /// `("TARGET" Value)?`
    fn parse_target(&mut self) -> ParseResult<Option<Literal>> {
        if self.eat_keyword(Keyword::Target) {
            self.parse_value().map(Some)
        } else {
            Ok(None)
        }
    }

    // ----- conditions -----

    /// Left-associative AND chain
    fn parse_conditions(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_condition()?;
        loop {
            if self.eat_keyword(Keyword::And) {
                let right = self.parse_condition()?;
                expr = Expr::Binary(BinaryExpression::new(expr, BinaryOperator::And, right));
            } else if self.peek().is_keyword(Keyword::Or) {
                return Err(self.or_not_supported());
            } else {
                return Ok(expr);
            }
        }
    }

    /// `Operand CmpOp Value | Operand BETWEEN Value AND Value | Operand NOT? IN List`
    fn parse_condition(&mut self) -> ParseResult<Expr> {
        let left = self.parse_operand()?;

        let (operator, right) = match self.peek().kind {
            TokenKind::Operator(op) => {
                self.advance();
                (BinaryOperator::from(op), Expr::Literal(self.parse_value()?))
            }
            TokenKind::Keyword(Keyword::Between) => {
                let position = self.advance().position();
                let start = self.parse_value()?;
                self.expect_keyword(Keyword::And)?;
                let end = self.parse_value()?;
                let range = DateRange {
                    start,
                    end,
                    position,
                };
                (BinaryOperator::Between, Expr::DateRange(range))
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                self.expect_keyword(Keyword::In)?;
                (BinaryOperator::NotIn, Expr::List(self.parse_value_list()?))
            }
            TokenKind::Keyword(Keyword::In) => {
                self.advance();
                (BinaryOperator::In, Expr::List(self.parse_value_list()?))
            }
            _ => {
                return Err(self.unexpected(
                    "Expected comparison",
                    "a comparison operator, BETWEEN or IN",
                ))
            }
        };

        Ok(Expr::Binary(BinaryExpression::new(left, operator, right)))
    }

    /// `Field | AggFunc "(" Field ")"`
    fn parse_operand(&mut self) -> ParseResult<Expr> {
        let name = self.parse_field()?;
        if !matches!(self.peek().kind, TokenKind::LeftParen) {
            return Ok(Expr::Identifier(name));
        }

        let Some(function) = AggregationFunc::from_name(&name.name) else {
            return Err(ParseError::new(
                format!("Unknown aggregation function '{}'", name.name),
                name.position,
            )
            .expected("SUM, AVG, MIN, MAX or COUNT")
            .found(name.name));
        };

        self.advance();
        let argument = self.parse_field()?;
        self.expect(&TokenKind::RightParen, "')'")?;

        Ok(Expr::Function(FunctionCall {
            function,
            argument,
            position: name.position,
        }))
    }

    /// `"(" Value ("," Value)* ")"`
    fn parse_value_list(&mut self) -> ParseResult<ListExpr> {
        let position = self.expect(&TokenKind::LeftParen, "'('")?.position();
        let mut items = vec![Expr::Literal(self.parse_value()?)];
        while self.eat(&TokenKind::Comma) {
            items.push(Expr::Literal(self.parse_value()?));
        }
        self.expect(&TokenKind::RightParen, "')' or ','")?;
        Ok(ListExpr { items, position })
    }

    /// `String | Number | Date | Percentage`
    fn parse_value(&mut self) -> ParseResult<Literal> {
        let token = self.peek();
        let position = token.position();
        let literal = match &token.kind {
            TokenKind::String(s) => Literal::string(s.clone(), position),
            TokenKind::Date(d) => Literal::new(LiteralValue::Date(d.clone()), position),
            TokenKind::Number(n) => Literal::number(*n, position),
            TokenKind::Percentage(p) => Literal::new(LiteralValue::Percentage(*p), position),
            _ => return Err(self.unexpected("Expected value", "a string, number or date")),
        };
        self.advance();
        Ok(literal)
    }

    /// A field name; clause-structure keywords are rejected
    fn parse_field(&mut self) -> ParseResult<Identifier> {
        let token = self.peek();
        let accepted = match token.kind {
            TokenKind::Identifier(_) => true,
            TokenKind::Keyword(k) => is_field_keyword(k),
            _ => false,
        };

        match token.as_word() {
            Some(word) if accepted => {
                let id = Identifier::new(word, token.position());
                self.advance();
                Ok(id)
            }
            _ => Err(self.unexpected("Expected field name", "a field name")),
        }
    }

    /// One of a fixed set of words
    fn parse_option<T>(
        &mut self,
        from_name: fn(&str) -> Option<T>,
        names: &[&str],
        what: &str,
    ) -> ParseResult<(T, Position)> {
        let token = self.peek();
        let position = token.position();
        match token.as_word().and_then(from_name) {
            Some(value) => {
                self.advance();
                Ok((value, position))
            }
            None => Err(self.unexpected(format!("Invalid {}", what), format!("one of {}", names.join(", ")))),
        }
    }

    // ----- token helpers -----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if !self.tokens[index].is_eof() {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<Token> {
        if &self.peek().kind == kind {
            Ok(self.advance().clone())
        } else {
            Err(self.unexpected("Unexpected token", expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.peek().is_keyword(keyword) {
            Ok(self.advance().clone())
        } else {
            Err(self.unexpected("Unexpected token", keyword.as_str()))
        }
    }

    /// Error at the current token
    fn unexpected(&self, message: impl Into<String>, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::new(message, token.position())
            .expected(expected)
            .found(token.snippet())
    }

    fn or_not_supported(&self) -> ParseError {
        let token = self.peek();
        ParseError::new("OR is not supported; combine conditions with AND", token.position())
            .found(token.snippet())
    }
}

/// Keywords that double as field names (`SHOW utilization`)
fn is_field_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Retainer | Keyword::Utilization | Keyword::Rollover
    )
}
