//! WHERE clause handler
//!
//! Known filter fields and their rules:
//!
//! | field          | accepted                                  |
//! |----------------|-------------------------------------------|
//! | `year`/`month` | any comparison, all treated as equality   |
//! | `project`      | `=` string, `IN` / `NOT IN` string list   |
//! | `date`         | `BETWEEN` two calendar dates, start ≤ end |
//!
//! Anything else is ignored with a warning.

use crate::query::ast::{BinaryExpression, BinaryOperator, Clause, ClauseType, Expr, Literal, LiteralValue};
use crate::query::error::{QueryError, QueryResult};
use crate::query::interpreter::{DateRangeFilter, InterpretContext};
use crate::query::validate::ValidationResult;

use super::ClauseHandler;

/// Handles WHERE clauses; several WHERE clauses merge into one filter
pub struct WhereHandler;

impl ClauseHandler for WhereHandler {
    fn name(&self) -> &'static str {
        "where"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[ClauseType::Where]
    }

    fn validate(&self, clause: &Clause, result: &mut ValidationResult) {
        let Clause::Where(where_clause) = clause else {
            return;
        };

        for condition in where_clause.condition.conjuncts() {
            let Expr::Binary(binary) = condition else {
                continue;
            };

            let field = match binary.left.as_ref() {
                Expr::Identifier(id) => id.name.to_ascii_lowercase(),
                Expr::Function(call) => {
                    result.error(format!(
                        "{}: aggregation {}() is not allowed in WHERE; use HAVING",
                        call.position,
                        call.function.as_str().to_uppercase()
                    ));
                    continue;
                }
                _ => continue,
            };

            let allowed = match field.as_str() {
                "project" => matches!(
                    binary.operator,
                    BinaryOperator::Eq | BinaryOperator::In | BinaryOperator::NotIn
                ),
                "date" => binary.operator == BinaryOperator::Between,
                _ => true,
            };
            if !allowed {
                result.error(format!(
                    "{}: operator {} is not supported for {}",
                    binary.position, binary.operator, field
                ));
            }
        }
    }

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        let Clause::Where(where_clause) = clause else {
            return Err(QueryError::UnknownClause(clause.clause_type()));
        };

        ctx.builder().filter_mut();
        for condition in where_clause.condition.conjuncts() {
            match condition {
                Expr::Binary(binary) => apply_condition(binary, ctx)?,
                other => {
                    return Err(QueryError::InvalidCondition(format!(
                        "expected a comparison at {}",
                        other.position()
                    )))
                }
            }
        }
        Ok(())
    }
}

fn apply_condition(binary: &BinaryExpression, ctx: &mut InterpretContext) -> QueryResult<()> {
    let name = match binary.left.as_ref() {
        Expr::Identifier(id) => &id.name,
        Expr::Function(call) => {
            return Err(QueryError::InvalidCondition(format!(
                "aggregation {}() is not allowed in WHERE; use HAVING",
                call.function.as_str().to_uppercase()
            )))
        }
        other => {
            return Err(QueryError::InvalidCondition(format!(
                "expected a field name at {}",
                other.position()
            )))
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "year" => {
            let literal = calendar_literal(binary, "year", ctx)?;
            if let Some(year) = whole_number(literal, "year", ctx) {
                match i32::try_from(year) {
                    Ok(year) if (1..=9999).contains(&year) => ctx.builder().filter_mut().year = Some(year),
                    _ => ctx.warn(format!("Ignoring year condition: {} is out of range", year)),
                }
            }
        }
        "month" => {
            let literal = calendar_literal(binary, "month", ctx)?;
            if let Some(month) = whole_number(literal, "month", ctx) {
                match u32::try_from(month) {
                    Ok(month) if (1..=12).contains(&month) => ctx.builder().filter_mut().month = Some(month),
                    _ => ctx.warn(format!("Ignoring month condition: {} is not between 1 and 12", month)),
                }
            }
        }
        "project" => apply_project(binary, ctx)?,
        "date" => {
            let range = date_range(binary)?;
            ctx.builder().filter_mut().date_range = Some(range);
        }
        _ => ctx.warn(format!(
            "Ignoring condition on unknown field '{}' at {}",
            name, binary.position
        )),
    }
    Ok(())
}

/// The literal on the right of a year/month condition
///
/// Every comparison operator is accepted and treated as `=`.
// TODO: honour range operators once report consumers stop relying on equality
fn calendar_literal<'a>(
    binary: &'a BinaryExpression,
    field: &str,
    ctx: &mut InterpretContext,
) -> QueryResult<&'a Literal> {
    let Expr::Literal(literal) = binary.right.as_ref() else {
        return Err(QueryError::InvalidCondition(format!(
            "{} {} requires a single value",
            field, binary.operator
        )));
    };
    if binary.operator != BinaryOperator::Eq {
        ctx.warn(format!(
            "Operator '{}' on {} is treated as '=' at {}",
            binary.operator, field, binary.position
        ));
    }
    Ok(literal)
}

/// A whole number from a numeric or numeric-string literal; warns and
/// returns `None` for anything else
fn whole_number(literal: &Literal, field: &str, ctx: &mut InterpretContext) -> Option<i64> {
    let value = match &literal.value {
        LiteralValue::Number(n) => Some(*n),
        LiteralValue::String(s) => s.trim().parse::<f64>().ok(),
        LiteralValue::Date(_) | LiteralValue::Percentage(_) => None,
    };

    match value {
        Some(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => {
            ctx.warn(format!(
                "Ignoring {} condition: {} is not a whole number",
                field, literal
            ));
            None
        }
    }
}

fn apply_project(binary: &BinaryExpression, ctx: &mut InterpretContext) -> QueryResult<()> {
    match binary.operator {
        BinaryOperator::Eq => {
            let project = project_name(binary.right.as_ref())?;
            ctx.builder().filter_mut().project = Some(project);
        }
        BinaryOperator::In | BinaryOperator::NotIn => {
            let Expr::List(list) = binary.right.as_ref() else {
                return Err(QueryError::InvalidCondition(format!(
                    "project {} requires a value list",
                    binary.operator
                )));
            };
            let names = list
                .items
                .iter()
                .map(project_name)
                .collect::<QueryResult<Vec<_>>>()?;

            let filter = ctx.builder().filter_mut();
            let target = if binary.operator == BinaryOperator::In {
                &mut filter.projects
            } else {
                &mut filter.excluded_projects
            };
            target.get_or_insert_with(Vec::new).extend(names);
        }
        other => {
            return Err(QueryError::InvalidCondition(format!(
                "project supports =, IN and NOT IN, not {}",
                other
            )))
        }
    }
    Ok(())
}

fn project_name(expr: &Expr) -> QueryResult<String> {
    match expr {
        Expr::Literal(literal) => literal.as_text().map(str::to_string).ok_or_else(|| {
            QueryError::InvalidCondition(format!(
                "project name must be a string, found {} {}",
                literal.data_type(),
                literal
            ))
        }),
        other => Err(QueryError::InvalidCondition(format!(
            "project name must be a string at {}",
            other.position()
        ))),
    }
}

fn date_range(binary: &BinaryExpression) -> QueryResult<DateRangeFilter> {
    let range = match (binary.operator, binary.right.as_ref()) {
        (BinaryOperator::Between, Expr::DateRange(range)) => range,
        (op, _) => {
            return Err(QueryError::InvalidCondition(format!(
                "date conditions require BETWEEN, not {}",
                op
            )))
        }
    };

    let endpoint = |literal: &Literal| {
        literal.as_date().ok_or_else(|| {
            QueryError::InvalidCondition(format!(
                "{} is not a valid YYYY-MM-DD date at {}",
                literal, literal.position
            ))
        })
    };
    let start = endpoint(&range.start)?;
    let end = endpoint(&range.end)?;

    if start > end {
        return Err(QueryError::InvalidCondition(format!(
            "date range starts after it ends ({} > {})",
            start, end
        )));
    }
    Ok(DateRangeFilter { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;

    fn validate(input: &str) -> ValidationResult {
        let query = parse_query(input).unwrap();
        let mut result = ValidationResult::new();
        WhereHandler.validate(&query.clauses[0], &mut result);
        result
    }

    #[test]
    fn test_validate_operator_rules() {
        assert!(validate(r#"WHERE project = "A" AND year > 2000 AND foo != 1"#).is_valid());

        let result = validate(r#"WHERE project > "A" AND date = "2024-01-01""#);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("operator > is not supported for project"));
        assert!(result.errors[1].contains("operator = is not supported for date"));
    }

    #[test]
    fn test_validate_rejects_aggregation() {
        let result = validate("WHERE SUM(hours) > 3");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("use HAVING"));
    }

    #[test]
    fn test_field_names_ignore_case() {
        let query = parse_query(r#"WHERE Year = 2024 AND PROJECT = "A""#).unwrap();
        let mut ctx = InterpretContext::new();
        WhereHandler.interpret(&query.clauses[0], &mut ctx).unwrap();

        let built = ctx.builder().build();
        let filter = built.filter().unwrap();
        assert_eq!(filter.year, Some(2024));
        assert_eq!(filter.project.as_deref(), Some("A"));
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_project_lists_accumulate() {
        let query = parse_query(r#"WHERE project IN ("A") AND project IN ("B")"#).unwrap();
        let mut ctx = InterpretContext::new();
        WhereHandler.interpret(&query.clauses[0], &mut ctx).unwrap();

        let built = ctx.builder().build();
        assert_eq!(
            built.filter().unwrap().projects,
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_out_of_range_year_warns() {
        let query = parse_query("WHERE year = 123456").unwrap();
        let mut ctx = InterpretContext::new();
        WhereHandler.interpret(&query.clauses[0], &mut ctx).unwrap();
        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.builder().build().filter().unwrap().year, None);
    }
}
