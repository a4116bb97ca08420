//! SHOW clause handler

use std::collections::HashSet;
use std::sync::Arc;

use crate::columns::FieldRegistry;
use crate::query::ast::{Clause, ClauseType, ShowField};
use crate::query::error::{QueryError, QueryResult};
use crate::query::interpreter::{InterpretContext, ShowFieldSpec, ShowSpec};
use crate::query::validate::ValidationResult;

use super::ClauseHandler;

/// Normalizes SHOW fields against the field registry
pub struct ShowHandler {
    fields: Arc<FieldRegistry>,
}

impl ShowHandler {
    pub fn new(fields: Arc<FieldRegistry>) -> Self {
        Self { fields }
    }

    fn spec_for(&self, field: &ShowField) -> Option<ShowFieldSpec> {
        let name = field.field_name()?;
        Some(ShowFieldSpec {
            field: self.fields.normalize(name),
            aggregation: field.aggregation(),
            alias: field.alias.clone(),
            format: field.format,
        })
    }
}

impl ClauseHandler for ShowHandler {
    fn name(&self) -> &'static str {
        "show"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[ClauseType::Show]
    }

    fn validate(&self, clause: &Clause, result: &mut ValidationResult) {
        let Clause::Show(show) = clause else {
            return;
        };

        let mut seen = HashSet::new();
        for field in &show.fields {
            let Some(name) = field.field_name() else {
                continue;
            };
            let position = field.expr.position();

            let Some(definition) = self.fields.resolve(name) else {
                result.warning(format!("{}: unknown field '{}' will not be shown", position, name));
                continue;
            };

            if let Some(function) = field.aggregation() {
                if !definition.aggregatable {
                    result.warning(format!(
                        "{}: {} cannot be aggregated; {}() will be ignored",
                        position,
                        definition.key,
                        function.as_str().to_uppercase()
                    ));
                }
            }

            let label = field.alias.clone().unwrap_or_else(|| {
                let agg = field.aggregation().map(|a| a.as_str()).unwrap_or("");
                format!("{}{}", agg, definition.key)
            });
            if !seen.insert(label.clone()) {
                result.warning(format!("{}: column '{}' is shown more than once", position, label));
            }
        }
    }

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        let Clause::Show(show) = clause else {
            return Err(QueryError::UnknownClause(clause.clause_type()));
        };

        let fields = show.fields.iter().filter_map(|f| self.spec_for(f)).collect();
        ctx.builder().show(ShowSpec { fields });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;

    fn validate(input: &str) -> ValidationResult {
        let handler = ShowHandler::new(Arc::new(FieldRegistry::builtin()));
        let query = parse_query(input).unwrap();
        let mut result = ValidationResult::new();
        handler.validate(&query.clauses[0], &mut result);
        result
    }

    #[test]
    fn test_known_fields_pass() {
        let result = validate("SHOW date, project, SUM(hours), invoiced");
        assert!(result.is_valid());
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_unknown_field_warns() {
        let result = validate("SHOW hours, invalid_field");
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("invalid_field"));
    }

    #[test]
    fn test_non_aggregatable_field_warns() {
        let result = validate("SHOW SUM(project)");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("cannot be aggregated"));
    }

    #[test]
    fn test_duplicate_column_warns() {
        let result = validate("SHOW hours, HOURS, SUM(hours)");
        assert_eq!(result.warnings.len(), 1);
    }
}
