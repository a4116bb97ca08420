//! Query validation
//!
//! Combines three passes over a parsed query and collects everything they
//! find instead of stopping at the first problem:
//!
//! 1. structural checks on the AST ([`ast::validate`])
//! 2. per-clause checks from the registered [`ClauseHandler`]s
//! 3. cross-clause constraints ([`check_clause_constraints`])
//!
//! [`ClauseHandler`]: crate::query::handlers::ClauseHandler

use serde::Serialize;
use std::collections::HashMap;

use crate::query::ast::{self, Clause, ClauseType, Query};
use crate::query::error::{QueryError, QueryResult};
use crate::query::handlers::ClauseRegistry;
use crate::query::token::Position;

/// Errors and warnings found while validating a query
///
/// Warnings never block compilation. Any error makes the query unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn errors into [`QueryError::Validation`], passing warnings through
    pub fn into_result(self) -> QueryResult<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(QueryError::Validation(self.errors))
        }
    }
}

/// Run every validation pass over a query
pub fn validate_query(query: &Query, registry: &ClauseRegistry) -> ValidationResult {
    let mut result = ValidationResult::new();

    for error in ast::validate(query) {
        result.error(error);
    }

    for clause in &query.clauses {
        match registry.handler_for(clause.clause_type()) {
            Some(handler) => handler.validate(clause, &mut result),
            None => result.error(format!(
                "{}: no handler registered for {} clauses",
                clause.position(),
                clause.clause_type()
            )),
        }
    }

    check_clause_constraints(query, &mut result);

    tracing::debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Validated query"
    );
    result
}

/// Constraints that involve more than one clause
///
/// - a non-WHERE clause type may appear only once
/// - CHART needs `VIEW chart` or `VIEW full`
/// - HAVING needs an earlier GROUP BY
/// - GROUP BY combined with SHOW needs an aggregation in SHOW
pub fn check_clause_constraints(query: &Query, result: &mut ValidationResult) {
    let mut first_seen: HashMap<ClauseType, Position> = HashMap::new();
    for clause in &query.clauses {
        let clause_type = clause.clause_type();
        if clause_type == ClauseType::Where {
            continue;
        }
        if let Some(first) = first_seen.get(&clause_type) {
            result.error(format!(
                "{}: duplicate {} clause (first defined at {})",
                clause.position(),
                clause_type,
                first
            ));
        } else {
            first_seen.insert(clause_type, clause.position());
        }
    }

    if let Some(Clause::Chart(chart)) = query.find_clause(ClauseType::Chart) {
        match query.find_clause(ClauseType::View) {
            Some(Clause::View(view)) if !view.mode.supports_chart() => result.error(format!(
                "{}: CHART {} requires VIEW chart or VIEW full, found VIEW {}",
                chart.position, chart.chart, view.mode
            )),
            None => result.warning(format!(
                "{}: CHART {} has no effect without VIEW chart or VIEW full",
                chart.position, chart.chart
            )),
            _ => {}
        }
    }

    let group_by_index = query
        .clauses
        .iter()
        .position(|c| c.clause_type() == ClauseType::GroupBy);

    for (index, clause) in query.clauses.iter().enumerate() {
        if clause.clause_type() == ClauseType::Having && group_by_index.map_or(true, |g| g > index) {
            result.error(format!(
                "{}: HAVING requires a preceding GROUP BY clause",
                clause.position()
            ));
        }
    }

    if let (Some(Clause::GroupBy(group)), Some(Clause::Show(show))) = (
        query.find_clause(ClauseType::GroupBy),
        query.find_clause(ClauseType::Show),
    ) {
        if !show.fields.iter().any(|f| f.aggregation().is_some()) {
            result.error(format!(
                "{}: GROUP BY requires at least one aggregation function in SHOW, e.g. SUM(hours)",
                group.position
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;

    fn check(input: &str) -> ValidationResult {
        let query = parse_query(input).unwrap();
        let mut result = ValidationResult::new();
        check_clause_constraints(&query, &mut result);
        result
    }

    #[test]
    fn test_valid_query_has_no_errors() {
        let result = check(
            "WHERE year = 2024 SHOW project, SUM(hours) GROUP BY project HAVING SUM(hours) > 10 VIEW chart CHART monthly",
        );
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_clause() {
        let result = check("VIEW chart\nVIEW table");
        assert_eq!(
            result.errors,
            vec!["line 2, column 1: duplicate VIEW clause (first defined at line 1, column 1)".to_string()]
        );
    }

    #[test]
    fn test_multiple_where_clauses_are_allowed() {
        assert!(check("WHERE year = 2024 WHERE month = 3").is_valid());
    }

    #[test]
    fn test_chart_requires_chart_view() {
        let result = check("VIEW summary CHART trend");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("CHART trend requires VIEW chart or VIEW full"));

        assert!(check("VIEW full CHART trend").is_valid());
    }

    #[test]
    fn test_chart_without_view_warns() {
        let result = check("CHART budget");
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_having_requires_group_by() {
        let result = check("HAVING SUM(hours) > 1");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("HAVING requires a preceding GROUP BY"));

        let result = check("SHOW SUM(hours) HAVING SUM(hours) > 1 GROUP BY project");
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_group_by_requires_aggregation_in_show() {
        let result = check("SHOW project, hours GROUP BY project");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("aggregation function"));

        assert!(check("GROUP BY project").is_valid());
    }

    #[test]
    fn test_into_result() {
        let mut result = ValidationResult::new();
        result.warning("careful");
        assert_eq!(result.clone().into_result().unwrap(), vec!["careful".to_string()]);

        result.error("broken");
        assert!(matches!(result.into_result(), Err(QueryError::Validation(e)) if e == vec!["broken"]));
    }
}
