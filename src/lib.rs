//! # timeql
//!
//! Query language for time-entry reports. A query such as
//!
//! ```text
//! WHERE year = 2024 AND project IN ("Acme", "Globex")
//! SHOW project, SUM(hours) AS "Hours"
//! GROUP BY project
//! VIEW table
//! ```
//!
//! is compiled into a structured [`InterpretedQuery`] (filters, grouping,
//! display options) plus the typed columns a report should render.
//!
//! ## Modules
//!
//! - [`query`]: Lexer, parser, AST utilities, validation and interpreter
//! - [`columns`]: Field registry, formatters and the SHOW column mapper
//! - [`compiler`]: One-call pipeline over both
//! - [`config`]: TOML/env configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use timeql::{Compiler, ViewMode};
//!
//! let compiled = Compiler::default().compile(
//!     r#"WHERE year = 2024 SHOW project, SUM(hours) GROUP BY project VIEW table"#,
//! )?;
//!
//! assert_eq!(compiled.query.view(), ViewMode::Table);
//! assert_eq!(compiled.columns.len(), 2);
//! assert_eq!(compiled.columns[1].label, "Hours (SUM)");
//! # Ok::<(), timeql::QueryError>(())
//! ```

#[macro_use]
mod macros;

pub mod columns;
pub mod compiler;
pub mod config;
pub mod query;

// Re-export top-level types for convenience
pub use compiler::{CompiledQuery, Compiler};

pub use config::{Config, ConfigError, FormattingConfig, LoggingConfig};

pub use query::{
    interpret, parse_query, validate_query, AggregationFunc, ChartType, ClauseHandler,
    ClauseRegistry, InterpretedQuery, Interpreter, Period, Query, QueryError, QueryResult,
    SizeMode, ValidationResult, ViewMode,
};

pub use columns::{ColumnDescriptor, ColumnMapper, FieldRegistry, FormatKind};
