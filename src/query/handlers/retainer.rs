//! Retainer analysis clauses: RETAINER, UTILIZATION and ROLLOVER

use crate::query::ast::{Clause, ClauseType, Literal, LiteralValue};
use crate::query::error::{QueryError, QueryResult};
use crate::query::interpreter::{InterpretContext, RetainerSpec, RolloverSpec, UtilizationSpec};
use crate::query::validate::ValidationResult;

use super::ClauseHandler;

pub struct RetainerHandler;

impl ClauseHandler for RetainerHandler {
    fn name(&self) -> &'static str {
        "retainer"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[
            ClauseType::Retainer,
            ClauseType::Utilization,
            ClauseType::Rollover,
        ]
    }

    fn validate(&self, clause: &Clause, result: &mut ValidationResult) {
        let checked = match clause {
            Clause::Retainer(c) => c.target.as_ref().map(|t| (t, hours_target(t))),
            Clause::Utilization(c) => c.target.as_ref().map(|t| (t, ratio_target(t))),
            Clause::Rollover(c) => c.target.as_ref().map(|t| (t, hours_target(t))),
            _ => None,
        };
        if let Some((target, Err(e))) = checked {
            result.error(format!("{}: {}", target.position, e));
        }
    }

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        match clause {
            Clause::Retainer(c) => {
                let target = c.target.as_ref().map(hours_target).transpose()?;
                ctx.builder().retainer(RetainerSpec {
                    analysis: c.analysis,
                    target,
                });
            }
            Clause::Utilization(c) => {
                let target = c.target.as_ref().map(ratio_target).transpose()?;
                ctx.builder().utilization(UtilizationSpec { mode: c.mode, target });
            }
            Clause::Rollover(c) => {
                let target = c.target.as_ref().map(hours_target).transpose()?;
                ctx.builder().rollover(RolloverSpec { mode: c.mode, target });
            }
            other => return Err(QueryError::UnknownClause(other.clause_type())),
        }
        Ok(())
    }
}

/// Hours: a non-negative plain number
fn hours_target(literal: &Literal) -> QueryResult<f64> {
    match literal.value {
        LiteralValue::Number(n) if n >= 0.0 => Ok(n),
        _ => Err(QueryError::InvalidValue(format!(
            "TARGET must be a non-negative number of hours, found {}",
            literal
        ))),
    }
}

/// A fraction in `0..=1`, written either as `75%` or `0.75`
fn ratio_target(literal: &Literal) -> QueryResult<f64> {
    let ratio = match literal.value {
        LiteralValue::Percentage(p) => p / 100.0,
        LiteralValue::Number(n) => n,
        _ => f64::NAN,
    };
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(QueryError::InvalidValue(format!(
            "utilization TARGET must be between 0% and 100% (e.g. 75% or 0.75), found {}",
            literal
        )))
    }
}
