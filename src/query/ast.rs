//! Query Abstract Syntax Tree
//!
//! Defines the AST for the timeql report language. Clauses and expressions
//! are closed sum types, so every traversal is checked for exhaustiveness and
//! a tree can never reach itself through its children.
//!
//! # Example Queries
//!
//! ```text
//! WHERE year = 2024 AND project = "Acme"
//! SHOW date, project, hours, invoiced
//! VIEW chart
//! CHART monthly
//! ```
//!
//! The [`Node`] view gives a uniform, borrowed handle over every node kind
//! and is what [`walk`], [`find_by_type`], [`stats`] and [`validate`] work on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::columns::FormatKind;
use crate::query::lexer::is_date_literal;
use crate::query::options::{
    AggregationFunc, ChartType, Period, RetainerAnalysis, RolloverMode, SizeMode, SortDirection,
    UtilizationMode, ViewMode,
};
use crate::query::token::{ComparisonOp, Position};

/// Root of a parsed query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Query")]
pub struct Query {
    /// Clauses in source order
    pub clauses: Vec<Clause>,
}

impl Query {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Clauses of one type, in source order
    pub fn clauses_of(&self, clause_type: ClauseType) -> impl Iterator<Item = &Clause> {
        self.clauses
            .iter()
            .filter(move |c| c.clause_type() == clause_type)
    }

    /// First clause of one type
    pub fn find_clause(&self, clause_type: ClauseType) -> Option<&Clause> {
        self.clauses_of(clause_type).next()
    }
}

/// Tag identifying a clause kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClauseType {
    Where,
    Show,
    View,
    Chart,
    Period,
    Size,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Retainer,
    Utilization,
    Rollover,
}

impl ClauseType {
    /// Every clause type, in parser priority order
    pub const ALL: [ClauseType; 13] = [
        Self::Where,
        Self::Show,
        Self::View,
        Self::Chart,
        Self::Period,
        Self::Size,
        Self::GroupBy,
        Self::Having,
        Self::OrderBy,
        Self::Limit,
        Self::Retainer,
        Self::Utilization,
        Self::Rollover,
    ];

    /// Leading keyword(s) as written in a query
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::Show => "SHOW",
            Self::View => "VIEW",
            Self::Chart => "CHART",
            Self::Period => "PERIOD",
            Self::Size => "SIZE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
            Self::Retainer => "RETAINER",
            Self::Utilization => "UTILIZATION",
            Self::Rollover => "ROLLOVER",
        }
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Clause {
    #[serde(rename = "WhereClause")]
    Where(WhereClause),
    #[serde(rename = "ShowClause")]
    Show(ShowClause),
    #[serde(rename = "ViewClause")]
    View(ViewClause),
    #[serde(rename = "ChartClause")]
    Chart(ChartClause),
    #[serde(rename = "PeriodClause")]
    Period(PeriodClause),
    #[serde(rename = "SizeClause")]
    Size(SizeClause),
    #[serde(rename = "GroupByClause")]
    GroupBy(GroupByClause),
    #[serde(rename = "HavingClause")]
    Having(HavingClause),
    #[serde(rename = "OrderByClause")]
    OrderBy(OrderByClause),
    #[serde(rename = "LimitClause")]
    Limit(LimitClause),
    #[serde(rename = "RetainerClause")]
    Retainer(RetainerClause),
    #[serde(rename = "UtilizationClause")]
    Utilization(UtilizationClause),
    #[serde(rename = "RolloverClause")]
    Rollover(RolloverClause),
}

impl Clause {
    pub fn clause_type(&self) -> ClauseType {
        match self {
            Self::Where(_) => ClauseType::Where,
            Self::Show(_) => ClauseType::Show,
            Self::View(_) => ClauseType::View,
            Self::Chart(_) => ClauseType::Chart,
            Self::Period(_) => ClauseType::Period,
            Self::Size(_) => ClauseType::Size,
            Self::GroupBy(_) => ClauseType::GroupBy,
            Self::Having(_) => ClauseType::Having,
            Self::OrderBy(_) => ClauseType::OrderBy,
            Self::Limit(_) => ClauseType::Limit,
            Self::Retainer(_) => ClauseType::Retainer,
            Self::Utilization(_) => ClauseType::Utilization,
            Self::Rollover(_) => ClauseType::Rollover,
        }
    }

    /// Position of the clause keyword
    pub fn position(&self) -> Position {
        match self {
            Self::Where(c) => c.position,
            Self::Show(c) => c.position,
            Self::View(c) => c.position,
            Self::Chart(c) => c.position,
            Self::Period(c) => c.position,
            Self::Size(c) => c.position,
            Self::GroupBy(c) => c.position,
            Self::Having(c) => c.position,
            Self::OrderBy(c) => c.position,
            Self::Limit(c) => c.position,
            Self::Retainer(c) => c.position,
            Self::Utilization(c) => c.position,
            Self::Rollover(c) => c.position,
        }
    }

    fn node_type(&self) -> NodeType {
        match self {
            Self::Where(_) => NodeType::WhereClause,
            Self::Show(_) => NodeType::ShowClause,
            Self::View(_) => NodeType::ViewClause,
            Self::Chart(_) => NodeType::ChartClause,
            Self::Period(_) => NodeType::PeriodClause,
            Self::Size(_) => NodeType::SizeClause,
            Self::GroupBy(_) => NodeType::GroupByClause,
            Self::Having(_) => NodeType::HavingClause,
            Self::OrderBy(_) => NodeType::OrderByClause,
            Self::Limit(_) => NodeType::LimitClause,
            Self::Retainer(_) => NodeType::RetainerClause,
            Self::Utilization(_) => NodeType::UtilizationClause,
            Self::Rollover(_) => NodeType::RolloverClause,
        }
    }
}

/// `WHERE cond AND cond ...`; the AND chain is a left-associative tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub condition: Expr,
    pub position: Position,
}

/// `HAVING cond AND cond ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavingClause {
    pub condition: Expr,
    pub position: Position,
}

/// `SHOW field, SUM(field) AS label FORMAT kind, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowClause {
    pub fields: Vec<ShowField>,
    pub position: Position,
}

/// One entry of a SHOW clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowField {
    /// An [`Expr::Identifier`] or [`Expr::Function`]
    pub expr: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,
}

impl ShowField {
    /// Name of the underlying field
    pub fn field_name(&self) -> Option<&str> {
        match &self.expr {
            Expr::Identifier(id) => Some(&id.name),
            Expr::Function(call) => Some(&call.argument.name),
            _ => None,
        }
    }

    pub fn aggregation(&self) -> Option<AggregationFunc> {
        match &self.expr {
            Expr::Function(call) => Some(call.function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewClause {
    pub mode: ViewMode,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartClause {
    pub chart: ChartType,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodClause {
    pub period: Period,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeClause {
    pub size: SizeMode,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByClause {
    pub fields: Vec<Identifier>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub items: Vec<OrderItem>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub field: Identifier,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub count: Literal,
    pub position: Position,
}

/// `RETAINER analysis [TARGET hours]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainerClause {
    pub analysis: RetainerAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Literal>,
    pub position: Position,
}

/// `UTILIZATION mode [TARGET ratio]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationClause {
    pub mode: UtilizationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Literal>,
    pub position: Position,
}

/// `ROLLOVER mode [TARGET cap]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverClause {
    pub mode: RolloverMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Literal>,
    pub position: Position,
}

/// An expression inside a clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    #[serde(rename = "BinaryExpression")]
    Binary(BinaryExpression),
    Literal(Literal),
    Identifier(Identifier),
    List(ListExpr),
    DateRange(DateRange),
    #[serde(rename = "FunctionCall")]
    Function(FunctionCall),
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Self::Binary(e) => e.position,
            Self::Literal(e) => e.position,
            Self::Identifier(e) => e.position,
            Self::List(e) => e.position,
            Self::DateRange(e) => e.position,
            Self::Function(e) => e.position,
        }
    }

    /// Flatten an AND chain into its conditions, left to right
    pub fn conjuncts(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Binary(b) if b.operator == BinaryOperator::And => {
                    stack.push(&b.right);
                    stack.push(&b.left);
                }
                other => out.push(other),
            }
        }
        out
    }
}

/// Binary operators; AND only ever joins conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "AND")]
    And,
}

impl BinaryOperator {
    /// The comparison this operator performs, if it is one
    pub fn comparison(&self) -> Option<ComparisonOp> {
        match self {
            Self::Eq => Some(ComparisonOp::Eq),
            Self::Ne => Some(ComparisonOp::Ne),
            Self::Gt => Some(ComparisonOp::Gt),
            Self::Gte => Some(ComparisonOp::Gte),
            Self::Lt => Some(ComparisonOp::Lt),
            Self::Lte => Some(ComparisonOp::Lte),
            _ => None,
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
            Self::Between => "BETWEEN",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::And => "AND",
        }
    }
}

impl From<ComparisonOp> for BinaryOperator {
    fn from(op: ComparisonOp) -> Self {
        match op {
            ComparisonOp::Eq => Self::Eq,
            ComparisonOp::Ne => Self::Ne,
            ComparisonOp::Gt => Self::Gt,
            ComparisonOp::Gte => Self::Gte,
            ComparisonOp::Lt => Self::Lt,
            ComparisonOp::Lte => Self::Lte,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `left operator right`
///
/// `right` is a [`ListExpr`] for IN / NOT IN and a [`DateRange`] for BETWEEN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
    pub position: Position,
}

impl BinaryExpression {
    pub fn new(left: Expr, operator: BinaryOperator, right: Expr) -> Self {
        let position = left.position();
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            position,
        }
    }

    /// Move nested binary operands into `pending`, leaving empty lists behind
    fn detach_operands(&mut self, pending: &mut Vec<BinaryExpression>) {
        for side in [&mut self.left, &mut self.right] {
            if matches!(**side, Expr::Binary(_)) {
                let placeholder = Expr::List(ListExpr {
                    items: Vec::new(),
                    position: Position::default(),
                });
                if let Expr::Binary(inner) = std::mem::replace(side.as_mut(), placeholder) {
                    pending.push(inner);
                }
            }
        }
    }
}

// Long AND chains nest one level per condition; drop them iteratively.
impl Drop for BinaryExpression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_operands(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_operands(&mut pending);
        }
    }
}

/// Data type tag of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Date,
    Percentage,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::Percentage => "percentage",
        };
        f.write_str(name)
    }
}

/// Literal payload, tagged by data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value", rename_all = "lowercase")]
pub enum LiteralValue {
    String(String),
    Number(f64),
    /// `YYYY-MM-DD`, kept as written
    Date(String),
    /// As written: `75%` is 75.0
    Percentage(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub position: Position,
}

impl Literal {
    pub fn new(value: LiteralValue, position: Position) -> Self {
        Self { value, position }
    }

    /// A string literal, retagged as a date when it has `YYYY-MM-DD` form
    pub fn string(value: impl Into<String>, position: Position) -> Self {
        let value = value.into();
        let value = if is_date_literal(&value) {
            LiteralValue::Date(value)
        } else {
            LiteralValue::String(value)
        };
        Self { value, position }
    }

    pub fn number(value: f64, position: Position) -> Self {
        Self::new(LiteralValue::Number(value), position)
    }

    pub fn data_type(&self) -> DataType {
        match self.value {
            LiteralValue::String(_) => DataType::String,
            LiteralValue::Number(_) => DataType::Number,
            LiteralValue::Date(_) => DataType::Date,
            LiteralValue::Percentage(_) => DataType::Percentage,
        }
    }

    /// Text of string and date literals
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            LiteralValue::String(s) | LiteralValue::Date(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a date literal (or date-shaped string) into a calendar date
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_text()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            LiteralValue::String(s) | LiteralValue::Date(s) => write!(f, "\"{}\"", s),
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::Percentage(p) => write!(f, "{}%", p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
}

impl Identifier {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Parenthesised value list of an IN condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListExpr {
    pub items: Vec<Expr>,
    pub position: Position,
}

/// The `a AND b` operand of BETWEEN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Literal,
    pub end: Literal,
    pub position: Position,
}

/// `SUM(hours)` and friends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function: AggregationFunc,
    pub argument: Identifier,
    pub position: Position,
}

/// Tag of every node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Query,
    WhereClause,
    ShowClause,
    ViewClause,
    ChartClause,
    PeriodClause,
    SizeClause,
    GroupByClause,
    HavingClause,
    OrderByClause,
    LimitClause,
    RetainerClause,
    UtilizationClause,
    RolloverClause,
    BinaryExpression,
    Literal,
    Identifier,
    List,
    DateRange,
    FunctionCall,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Borrowed view of any AST node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Query(&'a Query),
    Clause(&'a Clause),
    Binary(&'a BinaryExpression),
    Literal(&'a Literal),
    Identifier(&'a Identifier),
    List(&'a ListExpr),
    DateRange(&'a DateRange),
    Function(&'a FunctionCall),
}

impl<'a> From<&'a Query> for Node<'a> {
    fn from(query: &'a Query) -> Self {
        Node::Query(query)
    }
}

impl<'a> From<&'a Clause> for Node<'a> {
    fn from(clause: &'a Clause) -> Self {
        Node::Clause(clause)
    }
}

impl<'a> From<&'a Expr> for Node<'a> {
    fn from(expr: &'a Expr) -> Self {
        match expr {
            Expr::Binary(e) => Node::Binary(e),
            Expr::Literal(e) => Node::Literal(e),
            Expr::Identifier(e) => Node::Identifier(e),
            Expr::List(e) => Node::List(e),
            Expr::DateRange(e) => Node::DateRange(e),
            Expr::Function(e) => Node::Function(e),
        }
    }
}

impl<'a> Node<'a> {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Query(_) => NodeType::Query,
            Node::Clause(c) => c.node_type(),
            Node::Binary(_) => NodeType::BinaryExpression,
            Node::Literal(_) => NodeType::Literal,
            Node::Identifier(_) => NodeType::Identifier,
            Node::List(_) => NodeType::List,
            Node::DateRange(_) => NodeType::DateRange,
            Node::Function(_) => NodeType::FunctionCall,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Node::Query(q) => q
                .clauses
                .first()
                .map(Clause::position)
                .unwrap_or_else(Position::start),
            Node::Clause(c) => c.position(),
            Node::Binary(e) => e.position,
            Node::Literal(e) => e.position,
            Node::Identifier(e) => e.position,
            Node::List(e) => e.position,
            Node::DateRange(e) => e.position,
            Node::Function(e) => e.position,
        }
    }

    /// Direct children in traversal order
    pub fn children(&self) -> Vec<Node<'a>> {
        match *self {
            Node::Query(q) => q.clauses.iter().map(Node::Clause).collect(),
            Node::Clause(clause) => match clause {
                Clause::Where(c) => vec![Node::from(&c.condition)],
                Clause::Having(c) => vec![Node::from(&c.condition)],
                Clause::Show(c) => c.fields.iter().map(|f| Node::from(&f.expr)).collect(),
                Clause::GroupBy(c) => c.fields.iter().map(Node::Identifier).collect(),
                Clause::OrderBy(c) => c.items.iter().map(|i| Node::Identifier(&i.field)).collect(),
                Clause::Limit(c) => vec![Node::Literal(&c.count)],
                Clause::Retainer(c) => c.target.iter().map(Node::Literal).collect(),
                Clause::Utilization(c) => c.target.iter().map(Node::Literal).collect(),
                Clause::Rollover(c) => c.target.iter().map(Node::Literal).collect(),
                Clause::View(_) | Clause::Chart(_) | Clause::Period(_) | Clause::Size(_) => {
                    Vec::new()
                }
            },
            Node::Binary(e) => vec![Node::from(e.left.as_ref()), Node::from(e.right.as_ref())],
            Node::List(e) => e.items.iter().map(Node::from).collect(),
            Node::DateRange(e) => vec![Node::Literal(&e.start), Node::Literal(&e.end)],
            Node::Function(e) => vec![Node::Identifier(&e.argument)],
            Node::Literal(_) | Node::Identifier(_) => Vec::new(),
        }
    }
}

/// Pre-order depth-first traversal
///
/// `visitor` sees each node before its children. Uses an explicit stack, so
/// arbitrarily deep trees do not grow the call stack.
pub fn walk<'a, F>(node: impl Into<Node<'a>>, mut visitor: F)
where
    F: FnMut(Node<'a>),
{
    let mut stack = vec![node.into()];
    while let Some(current) = stack.pop() {
        visitor(current);
        let mut children = current.children();
        children.reverse();
        stack.extend(children);
    }
}

/// All nodes of one type, in [`walk`] order
pub fn find_by_type<'a>(node: impl Into<Node<'a>>, node_type: NodeType) -> Vec<Node<'a>> {
    let mut found = Vec::new();
    walk(node, |n| {
        if n.node_type() == node_type {
            found.push(n);
        }
    });
    found
}

/// Structural statistics of a tree
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AstStats {
    pub node_count: usize,
    /// Depth of the deepest node; a lone root has depth 1
    pub max_depth: usize,
    pub by_type: BTreeMap<NodeType, usize>,
}

/// Count nodes by type and measure depth
pub fn stats<'a>(node: impl Into<Node<'a>>) -> AstStats {
    let mut result = AstStats::default();
    let mut stack = vec![(node.into(), 1usize)];

    while let Some((current, depth)) = stack.pop() {
        result.node_count += 1;
        result.max_depth = result.max_depth.max(depth);
        *result.by_type.entry(current.node_type()).or_insert(0) += 1;
        stack.extend(current.children().into_iter().map(|c| (c, depth + 1)));
    }

    result
}

/// Check structural well-formedness
///
/// Returns every problem found rather than stopping at the first one.
pub fn validate<'a>(node: impl Into<Node<'a>>) -> Vec<String> {
    let mut errors = Vec::new();
    walk(node, |n| check_node(n, &mut errors));
    errors
}

fn check_node(node: Node<'_>, errors: &mut Vec<String>) {
    let mut error = |message: String| errors.push(format!("{}: {}", node.position(), message));

    match node {
        Node::Query(_) => {}
        Node::Clause(clause) => match clause {
            Clause::Where(c) if !is_condition(&c.condition) => {
                error("WHERE requires a condition".to_string())
            }
            Clause::Having(c) if !is_condition(&c.condition) => {
                error("HAVING requires a condition".to_string())
            }
            Clause::Show(c) if c.fields.is_empty() => error("SHOW requires at least one field".to_string()),
            Clause::Show(c) => {
                for field in &c.fields {
                    if !is_operand(&field.expr) {
                        error("SHOW fields must be field names or aggregation calls".to_string());
                    }
                }
            }
            Clause::GroupBy(c) if c.fields.is_empty() => {
                error("GROUP BY requires at least one field".to_string())
            }
            Clause::OrderBy(c) if c.items.is_empty() => {
                error("ORDER BY requires at least one field".to_string())
            }
            _ => {}
        },
        Node::Binary(b) => {
            let shape_ok = match b.operator {
                BinaryOperator::And => is_condition(&b.left) && is_condition(&b.right),
                BinaryOperator::Between => {
                    is_operand(&b.left) && matches!(*b.right, Expr::DateRange(_))
                }
                BinaryOperator::In | BinaryOperator::NotIn => {
                    is_operand(&b.left) && matches!(*b.right, Expr::List(_))
                }
                _ => is_operand(&b.left) && matches!(*b.right, Expr::Literal(_)),
            };
            if !shape_ok {
                error(format!("malformed {} expression", b.operator));
            }
        }
        Node::Literal(lit) => match &lit.value {
            LiteralValue::Number(n) | LiteralValue::Percentage(n) if !n.is_finite() => {
                error(format!("{} literal is not a finite number", lit.data_type()))
            }
            LiteralValue::Date(d) if !is_date_literal(d) || lit.as_date().is_none() => {
                error(format!("'{}' is not a valid YYYY-MM-DD date", d))
            }
            _ => {}
        },
        Node::Identifier(id) => {
            if id.name.is_empty() {
                error("identifier name is empty".to_string());
            } else if !is_valid_identifier(&id.name) {
                error(format!("'{}' is not a valid identifier", id.name));
            }
        }
        Node::List(list) => {
            if list.items.is_empty() {
                error("value list is empty".to_string());
            }
            if list.items.iter().any(|item| !matches!(item, Expr::Literal(_))) {
                error("value lists may only contain literals".to_string());
            }
        }
        Node::DateRange(_) | Node::Function(_) => {}
    }
}

/// A comparison or an AND of comparisons
fn is_condition(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary(_))
}

/// Left-hand side of a condition or a SHOW field
fn is_operand(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier(_) | Expr::Function(_))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
