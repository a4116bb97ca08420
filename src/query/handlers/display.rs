//! VIEW, CHART, PERIOD and SIZE
//!
//! These clauses carry a single option word already checked by the parser,
//! so interpretation just records it.

use crate::query::ast::{Clause, ClauseType};
use crate::query::error::{QueryError, QueryResult};
use crate::query::interpreter::InterpretContext;
use crate::query::validate::ValidationResult;

use super::ClauseHandler;

pub struct DisplayHandler;

impl ClauseHandler for DisplayHandler {
    fn name(&self) -> &'static str {
        "display"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[
            ClauseType::View,
            ClauseType::Chart,
            ClauseType::Period,
            ClauseType::Size,
        ]
    }

    fn validate(&self, _clause: &Clause, _result: &mut ValidationResult) {}

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        let builder = ctx.builder();
        match clause {
            Clause::View(c) => builder.view(c.mode),
            Clause::Chart(c) => builder.chart_type(c.chart),
            Clause::Period(c) => builder.period(c.period),
            Clause::Size(c) => builder.size(c.size),
            other => return Err(QueryError::UnknownClause(other.clause_type())),
        };
        Ok(())
    }
}
