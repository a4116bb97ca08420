//! Query Interpreter
//!
//! Turns a parsed [`Query`](ast::Query) into an [`InterpretedQuery`]: a
//! typed, defaulted description of the report an executor should produce.
//!
//! The interpreter itself only dispatches. Each clause is handed to the
//! [`ClauseHandler`](crate::query::handlers::ClauseHandler) registered for
//! its type, which records its effect on an [`InterpretContext`].

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::columns::{FieldRegistry, FormatKind};
use crate::query::ast;
use crate::query::error::{QueryError, QueryResult};
use crate::query::handlers::ClauseRegistry;
use crate::query::options::{
    AggregationFunc, ChartType, Period, RetainerAnalysis, RolloverMode, SizeMode, SortDirection,
    UtilizationMode, ViewMode,
};
use crate::query::token::ComparisonOp;

/// The interpreted form of a query
///
/// Built once per interpretation and never modified afterwards; fields are
/// only reachable through getters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedQuery {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<WhereFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show: Option<ShowSpec>,
    view: ViewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart_type: Option<ChartType>,
    period: Period,
    size: SizeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    having: Option<Vec<HavingCondition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_by: Option<Vec<OrderItemSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retainer: Option<RetainerSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    utilization: Option<UtilizationSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollover: Option<RolloverSpec>,
}

impl InterpretedQuery {
    /// Start building a query by hand
    pub fn builder() -> InterpretedQueryBuilder {
        InterpretedQueryBuilder::new()
    }

    /// Filters from WHERE clauses
    pub fn filter(&self) -> Option<&WhereFilter> {
        self.filter.as_ref()
    }

    pub fn show(&self) -> Option<&ShowSpec> {
        self.show.as_ref()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn chart_type(&self) -> Option<ChartType> {
        self.chart_type
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn size(&self) -> SizeMode {
        self.size
    }

    pub fn group_by(&self) -> Option<&[String]> {
        self.group_by.as_deref()
    }

    pub fn having(&self) -> Option<&[HavingCondition]> {
        self.having.as_deref()
    }

    pub fn order_by(&self) -> Option<&[OrderItemSpec]> {
        self.order_by.as_deref()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn retainer(&self) -> Option<&RetainerSpec> {
        self.retainer.as_ref()
    }

    pub fn utilization(&self) -> Option<&UtilizationSpec> {
        self.utilization.as_ref()
    }

    pub fn rollover(&self) -> Option<&RolloverSpec> {
        self.rollover.as_ref()
    }

    /// Date window an executor should scan
    ///
    /// An explicit `WHERE date BETWEEN` wins over PERIOD. `None` means no
    /// bound (`PERIOD all-time`).
    pub fn effective_date_range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self.filter.as_ref().and_then(|f| f.date_range) {
            Some(range) => Some((range.start, range.end)),
            None => self.period.date_range(today),
        }
    }
}

/// Conditions collected from WHERE clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_projects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRangeFilter>,
}

impl WhereFilter {
    pub fn is_empty(&self) -> bool {
        self == &WhereFilter::default()
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRangeFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShowSpec {
    pub fields: Vec<ShowFieldSpec>,
}

/// One SHOW field with its key normalized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowFieldSpec {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationFunc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,
}

/// `HAVING [AGG(]field[)] op value`; percentages are stored as fractions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HavingCondition {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationFunc>,
    pub operator: ComparisonOp,
    pub value: f64,
}

impl HavingCondition {
    /// Test an aggregated value against the condition
    pub fn matches(&self, actual: f64) -> bool {
        self.operator.compare_f64(actual, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// `RETAINER`; target is in hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetainerSpec {
    pub analysis: RetainerAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// `UTILIZATION`; target is a fraction in `0..=1`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationSpec {
    pub mode: UtilizationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// `ROLLOVER`; target is the rollover cap in hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolloverSpec {
    pub mode: RolloverMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// Builder for [`InterpretedQuery`]
///
/// VIEW, PERIOD and SIZE fall back to their defaults when unset. Nothing
/// else is defaulted.
#[derive(Debug, Clone, Default)]
pub struct InterpretedQueryBuilder {
    filter: Option<WhereFilter>,
    show: Option<ShowSpec>,
    view: Option<ViewMode>,
    chart_type: Option<ChartType>,
    period: Option<Period>,
    size: Option<SizeMode>,
    group_by: Option<Vec<String>>,
    having: Option<Vec<HavingCondition>>,
    order_by: Option<Vec<OrderItemSpec>>,
    limit: Option<usize>,
    retainer: Option<RetainerSpec>,
    utilization: Option<UtilizationSpec>,
    rollover: Option<RolloverSpec>,
}

impl InterpretedQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The WHERE filter, created empty on first use
    pub fn filter_mut(&mut self) -> &mut WhereFilter {
        self.filter.get_or_insert_with(WhereFilter::default)
    }

    pub fn show(&mut self, show: ShowSpec) -> &mut Self {
        self.show = Some(show);
        self
    }

    pub fn view(&mut self, view: ViewMode) -> &mut Self {
        self.view = Some(view);
        self
    }

    pub fn chart_type(&mut self, chart: ChartType) -> &mut Self {
        self.chart_type = Some(chart);
        self
    }

    pub fn period(&mut self, period: Period) -> &mut Self {
        self.period = Some(period);
        self
    }

    pub fn size(&mut self, size: SizeMode) -> &mut Self {
        self.size = Some(size);
        self
    }

    pub fn group_by(&mut self, fields: Vec<String>) -> &mut Self {
        self.group_by = Some(fields);
        self
    }

    pub fn having(&mut self, conditions: Vec<HavingCondition>) -> &mut Self {
        self.having = Some(conditions);
        self
    }

    pub fn order_by(&mut self, items: Vec<OrderItemSpec>) -> &mut Self {
        self.order_by = Some(items);
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn retainer(&mut self, spec: RetainerSpec) -> &mut Self {
        self.retainer = Some(spec);
        self
    }

    pub fn utilization(&mut self, spec: UtilizationSpec) -> &mut Self {
        self.utilization = Some(spec);
        self
    }

    pub fn rollover(&mut self, spec: RolloverSpec) -> &mut Self {
        self.rollover = Some(spec);
        self
    }

    /// Build the query, applying defaults
    pub fn build(&self) -> InterpretedQuery {
        InterpretedQuery {
            filter: self.filter.clone(),
            show: self.show.clone(),
            view: self.view.unwrap_or_default(),
            chart_type: self.chart_type,
            period: self.period.unwrap_or_default(),
            size: self.size.unwrap_or_default(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            retainer: self.retainer.clone(),
            utilization: self.utilization.clone(),
            rollover: self.rollover.clone(),
        }
    }
}

/// Mutable state shared by clause handlers during one interpretation
#[derive(Debug, Default)]
pub struct InterpretContext {
    builder: InterpretedQueryBuilder,
    warnings: Vec<String>,
}

impl InterpretContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder(&mut self) -> &mut InterpretedQueryBuilder {
        &mut self.builder
    }

    /// Record a non-fatal problem
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn finish(self) -> Interpretation {
        Interpretation {
            query: self.builder.build(),
            warnings: self.warnings,
        }
    }
}

/// An interpreted query plus the warnings raised while building it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub query: InterpretedQuery,
    pub warnings: Vec<String>,
}

/// Registry-driven interpreter
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: Arc<ClauseRegistry>,
}

impl Interpreter {
    pub fn new(registry: Arc<ClauseRegistry>) -> Self {
        Self { registry }
    }

    /// Interpreter with the built-in handlers over the given fields
    pub fn with_fields(fields: Arc<FieldRegistry>) -> Self {
        Self::new(Arc::new(ClauseRegistry::builtin(fields)))
    }

    pub fn registry(&self) -> &ClauseRegistry {
        &self.registry
    }

    /// Interpret a query, discarding warnings
    pub fn interpret(&self, query: &ast::Query) -> QueryResult<InterpretedQuery> {
        self.interpret_with_diagnostics(query).map(|i| i.query)
    }

    /// Interpret a query
    ///
    /// Clauses are applied in source order. A clause with no registered
    /// handler is a fatal [`QueryError::UnknownClause`].
    pub fn interpret_with_diagnostics(&self, query: &ast::Query) -> QueryResult<Interpretation> {
        let mut ctx = InterpretContext::new();

        for clause in &query.clauses {
            let clause_type = clause.clause_type();
            let handler = self
                .registry
                .handler_for(clause_type)
                .ok_or(QueryError::UnknownClause(clause_type))?;

            tracing::trace!(handler = handler.name(), clause = %clause_type, "Interpreting clause");
            handler.interpret(clause, &mut ctx)?;
        }

        let interpretation = ctx.finish();
        tracing::debug!(
            clauses = query.clauses.len(),
            warnings = interpretation.warnings.len(),
            "Interpreted query"
        );
        Ok(interpretation)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_fields(Arc::new(FieldRegistry::builtin()))
    }
}

/// Interpret with the built-in handlers and fields
pub fn interpret(query: &ast::Query) -> QueryResult<InterpretedQuery> {
    Interpreter::default().interpret(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;
    use serde_json::json;

    fn run(input: &str) -> Interpretation {
        let ast = parse_query(input).unwrap();
        Interpreter::default()
            .interpret_with_diagnostics(&ast)
            .unwrap_or_else(|e| panic!("failed to interpret {:?}: {}", input, e))
    }

    fn run_err(input: &str) -> QueryError {
        let ast = parse_query(input).unwrap();
        Interpreter::default().interpret(&ast).unwrap_err()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_query_defaults() {
        let result = run("");
        assert_eq!(
            serde_json::to_value(&result.query).unwrap(),
            json!({"view": "summary", "period": "current-year", "size": "normal"})
        );
        assert!(result.query.filter().is_none());
        assert!(result.query.show().is_none());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_where_conjunction() {
        let result = run(r#"WHERE year = 2024 AND month = 12 AND project = "X""#);
        assert_eq!(
            serde_json::to_value(result.query.filter()).unwrap(),
            json!({"year": 2024, "month": 12, "project": "X"})
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_where_between() {
        let result = run(r#"WHERE date BETWEEN "2024-01-01" AND "2024-12-31""#);
        let range = result.query.filter().unwrap().date_range.unwrap();
        assert_eq!(range.start, date(2024, 1, 1));
        assert_eq!(range.end, date(2024, 12, 31));
        assert_eq!(
            serde_json::to_value(result.query.filter()).unwrap(),
            json!({"dateRange": {"start": "2024-01-01", "end": "2024-12-31"}})
        );
    }

    #[test]
    fn test_between_rejects_reversed_range() {
        let err = run_err(r#"WHERE date BETWEEN "2024-12-31" AND "2024-01-01""#);
        assert!(matches!(err, QueryError::InvalidCondition(_)));
    }

    #[test]
    fn test_date_requires_between() {
        let err = run_err(r#"WHERE date = "2024-01-01""#);
        assert!(matches!(err, QueryError::InvalidCondition(m) if m.contains("BETWEEN")));
    }

    #[test]
    fn test_invalid_calendar_date() {
        let err = run_err(r#"WHERE date BETWEEN "2024-02-30" AND "2024-03-01""#);
        assert!(matches!(err, QueryError::InvalidCondition(_)));
    }

    #[test]
    fn test_unknown_field_is_ignored_with_warning() {
        let result = run("WHERE foo = 1");
        let filter = result.query.filter().unwrap();
        assert!(filter.is_empty());
        assert_eq!(serde_json::to_value(filter).unwrap(), json!({}));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("foo"));
    }

    #[test]
    fn test_year_operators_are_treated_as_equality() {
        let result = run("WHERE year > 2020");
        assert_eq!(result.query.filter().unwrap().year, Some(2020));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("treated as '='"));
    }

    #[test]
    fn test_year_string_is_coerced() {
        let result = run(r#"WHERE year = "2023" AND month = '7'"#);
        let filter = result.query.filter().unwrap();
        assert_eq!(filter.year, Some(2023));
        assert_eq!(filter.month, Some(7));
    }

    #[test]
    fn test_malformed_month_is_skipped() {
        let result = run(r#"WHERE month = "june" AND month = 13 AND year = 2024.5"#);
        let filter = result.query.filter().unwrap();
        assert_eq!(filter.month, None);
        assert_eq!(filter.year, None);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_year_with_list_is_an_error() {
        let err = run_err("WHERE year IN (2023, 2024)");
        assert!(matches!(err, QueryError::InvalidCondition(_)));
    }

    #[test]
    fn test_project_rules() {
        let result = run(r#"WHERE project IN ("A", "B") AND project NOT IN ("C")"#);
        let filter = result.query.filter().unwrap();
        assert_eq!(filter.projects, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(filter.excluded_projects, Some(vec!["C".to_string()]));

        assert!(matches!(run_err("WHERE project = 5"), QueryError::InvalidCondition(_)));
        assert!(matches!(
            run_err(r#"WHERE project != "A""#),
            QueryError::InvalidCondition(_)
        ));
    }

    #[test]
    fn test_aggregation_in_where_is_an_error() {
        let err = run_err("WHERE SUM(hours) > 3");
        assert!(matches!(err, QueryError::InvalidCondition(_)));
    }

    #[test]
    fn test_multiple_where_clauses_merge() {
        let result = run(r#"WHERE year = 2024 WHERE project = "A""#);
        let filter = result.query.filter().unwrap();
        assert_eq!(filter.year, Some(2024));
        assert_eq!(filter.project.as_deref(), Some("A"));
    }

    #[test]
    fn test_display_clauses() {
        let result = run("VIEW chart CHART burndown PERIOD last-3-months SIZE detailed");
        let query = result.query;
        assert_eq!(query.view(), ViewMode::Chart);
        assert_eq!(query.chart_type(), Some(ChartType::Burndown));
        assert_eq!(query.period(), Period::Last3Months);
        assert_eq!(query.size(), SizeMode::Detailed);
    }

    #[test]
    fn test_show_fields_are_normalized() {
        let result = run(r#"SHOW date, progress, SUM(hours) AS "Total" FORMAT decimal"#);
        let show = result.query.show().unwrap();
        let keys: Vec<&str> = show.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(keys, vec!["date", "budgetProgress", "hours"]);
        assert_eq!(show.fields[2].aggregation, Some(AggregationFunc::Sum));
        assert_eq!(show.fields[2].alias.as_deref(), Some("Total"));
        assert_eq!(show.fields[2].format, Some(FormatKind::Decimal));
    }

    #[test]
    fn test_grouping_and_ordering() {
        let result = run(
            "SHOW project, SUM(hours) GROUP BY project HAVING SUM(hours) >= 10 AND AVG(progress) < 50% \
             ORDER BY hours DESC LIMIT 10",
        );
        let query = result.query;
        assert_eq!(query.group_by(), Some(&["project".to_string()][..]));

        let having = query.having().unwrap();
        assert_eq!(having.len(), 2);
        assert_eq!(having[0].operator, ComparisonOp::Gte);
        assert_eq!(having[0].value, 10.0);
        assert_eq!(having[1].field, "budgetProgress");
        assert_eq!(having[1].value, 0.5);
        assert!(having[0].matches(12.0));

        let order = query.order_by().unwrap();
        assert_eq!(order[0].direction, SortDirection::Desc);
        assert_eq!(query.limit(), Some(10));
    }

    #[test]
    fn test_invalid_limit() {
        assert!(matches!(run_err("LIMIT 0"), QueryError::InvalidValue(_)));
        assert!(matches!(run_err("LIMIT 2.5"), QueryError::InvalidValue(_)));
    }

    #[test]
    fn test_extension_clauses() {
        let result = run("RETAINER health TARGET 40 UTILIZATION trend TARGET 80% ROLLOVER forecast");
        let query = result.query;
        assert_eq!(query.retainer().unwrap().analysis, RetainerAnalysis::Health);
        assert_eq!(query.retainer().unwrap().target, Some(40.0));
        assert_eq!(query.utilization().unwrap().target, Some(0.8));
        assert_eq!(query.rollover().unwrap().mode, RolloverMode::Forecast);
        assert_eq!(query.rollover().unwrap().target, None);
    }

    #[test]
    fn test_utilization_target_range() {
        assert_eq!(run("UTILIZATION current TARGET 0.75").query.utilization().unwrap().target, Some(0.75));
        assert!(matches!(run_err("UTILIZATION current TARGET 75"), QueryError::InvalidValue(_)));
        assert!(matches!(run_err("RETAINER usage TARGET 50%"), QueryError::InvalidValue(_)));
    }

    #[test]
    fn test_interpretation_is_repeatable_and_pure() {
        let ast = parse_query(r#"WHERE year = 2024 SHOW hours VIEW table"#).unwrap();
        let before = ast.clone();
        let interpreter = Interpreter::default();

        let first = interpreter.interpret(&ast).unwrap();
        let second = interpreter.interpret(&ast).unwrap();

        assert_eq!(first, second);
        assert_eq!(ast, before);
    }

    #[test]
    fn test_unknown_clause_is_fatal() {
        let ast = parse_query("VIEW chart").unwrap();
        let interpreter = Interpreter::new(Arc::new(ClauseRegistry::new()));
        assert_eq!(
            interpreter.interpret(&ast),
            Err(QueryError::UnknownClause(ast::ClauseType::View))
        );
    }

    #[test]
    fn test_effective_date_range() {
        let today = date(2024, 6, 15);

        let query = run("PERIOD current-month").query;
        assert_eq!(
            query.effective_date_range(today),
            Some((date(2024, 6, 1), date(2024, 6, 30)))
        );

        let query = run(r#"PERIOD all-time WHERE date BETWEEN "2024-02-01" AND "2024-02-29""#).query;
        assert_eq!(
            query.effective_date_range(today),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );

        assert_eq!(run("PERIOD all-time").query.effective_date_range(today), None);
    }

    #[test]
    fn test_builder_defaults() {
        let query = InterpretedQuery::builder().limit(3).build();
        assert_eq!(query.view(), ViewMode::Summary);
        assert_eq!(query.period(), Period::CurrentYear);
        assert_eq!(query.size(), SizeMode::Normal);
        assert_eq!(query.limit(), Some(3));
    }
}
