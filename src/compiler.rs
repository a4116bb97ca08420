//! Query compiler
//!
//! Runs the whole pipeline in one call: parse, validate, interpret, map
//! columns. All configuration is passed in when the compiler is built.

use serde::Serialize;
use std::sync::Arc;

use crate::columns::{ColumnDescriptor, ColumnMapper, FieldRegistry, MappedColumns};
use crate::config::Config;
use crate::query::{
    parse_query, validate_query, InterpretedQuery, Interpretation, Interpreter, Query,
    QueryResult, ShowSpec, ValidationResult,
};

/// Output of [`Compiler::compile`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub query: InterpretedQuery,
    pub columns: Vec<ColumnDescriptor>,
    pub warnings: Vec<String>,
}

/// Parse → validate → interpret → map columns
#[derive(Debug, Clone)]
pub struct Compiler {
    interpreter: Interpreter,
    mapper: ColumnMapper,
}

impl Compiler {
    /// Compiler over the built-in fields
    pub fn new(config: &Config) -> Self {
        Self::with_fields(Arc::new(FieldRegistry::builtin()), config)
    }

    pub fn with_fields(fields: Arc<FieldRegistry>, config: &Config) -> Self {
        Self {
            interpreter: Interpreter::with_fields(fields.clone()),
            mapper: ColumnMapper::new(fields, config.formatting.clone()),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn mapper(&self) -> &ColumnMapper {
        &self.mapper
    }

    pub fn parse(&self, source: &str) -> QueryResult<Query> {
        parse_query(source)
    }

    pub fn validate(&self, ast: &Query) -> ValidationResult {
        validate_query(ast, self.interpreter.registry())
    }

    pub fn interpret(&self, ast: &Query) -> QueryResult<Interpretation> {
        self.interpreter.interpret_with_diagnostics(ast)
    }

    pub fn columns(&self, show: &ShowSpec) -> MappedColumns {
        self.mapper.map_spec(show)
    }

    /// Compile a query string
    ///
    /// Fails on lexical, syntax, validation and interpretation errors.
    /// Warnings from validation and interpretation are collected in the
    /// result. Unknown or non-aggregatable SHOW fields are already reported
    /// by validation, so the mapper's copies of those warnings are dropped.
    pub fn compile(&self, source: &str) -> QueryResult<CompiledQuery> {
        let ast = self.parse(source)?;
        let mut warnings = self.validate(&ast).into_result()?;

        let interpretation = self.interpret(&ast)?;
        warnings.extend(interpretation.warnings);

        let columns = interpretation
            .query
            .show()
            .map(|show| self.columns(show).columns)
            .unwrap_or_default();

        tracing::debug!(
            columns = columns.len(),
            warnings = warnings.len(),
            "Compiled query"
        );

        Ok(CompiledQuery {
            query: interpretation.query,
            columns,
            warnings,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryError, ViewMode};

    #[test]
    fn test_compile_full_query() {
        let compiled = Compiler::default()
            .compile(
                r#"
                // hours per project this year
                WHERE year = 2024 AND project IN ("Acme", "Globex")
                SHOW project, SUM(hours) AS "Hours", invoiced
                GROUP BY project
                VIEW table
                "#,
            )
            .unwrap();

        assert_eq!(compiled.query.view(), ViewMode::Table);
        assert_eq!(compiled.query.group_by(), Some(&["project".to_string()][..]));
        assert_eq!(compiled.columns.len(), 3);
        assert_eq!(compiled.columns[1].label, "Hours");
        assert!(compiled.warnings.is_empty(), "{:?}", compiled.warnings);
    }

    #[test]
    fn test_warnings_are_not_duplicated() {
        let compiled = Compiler::default()
            .compile("WHERE foo = 1 SHOW hours, invalid_field, invoiced")
            .unwrap();

        assert_eq!(compiled.columns.len(), 2);
        assert_eq!(compiled.warnings.len(), 2, "{:?}", compiled.warnings);
        assert!(compiled.warnings.iter().any(|w| w.contains("invalid_field")));
        assert!(compiled.warnings.iter().any(|w| w.contains("'foo'")));
    }

    #[test]
    fn test_validation_errors_stop_compilation() {
        let err = Compiler::default()
            .compile("VIEW summary CHART trend HAVING hours > 1")
            .unwrap_err();
        match err {
            QueryError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_currency_symbol_from_config() {
        let mut config = Config::default();
        config.formatting.currency_symbol = "£".to_string();

        let compiled = Compiler::new(&config).compile("SHOW invoiced").unwrap();
        assert_eq!(compiled.columns[0].format(&2500.0.into()), "£2,500.00");
    }

    #[test]
    fn test_compile_long_and_chain() {
        let mut source = String::from("WHERE year = 2024");
        for _ in 0..20_000 {
            source.push_str(" AND month = 1");
        }

        let compiled = Compiler::default().compile(&source).unwrap();
        let filter = compiled.query.filter().unwrap();
        assert_eq!(filter.year, Some(2024));
        assert_eq!(filter.month, Some(1));
    }

    #[test]
    fn test_no_show_means_no_columns() {
        let compiled = Compiler::default().compile("PERIOD all-time").unwrap();
        assert!(compiled.columns.is_empty());
        assert!(compiled.query.show().is_none());
    }
}
