//! timeql Query Engine
//!
//! Compiles report queries over time entries:
//!
//! - **Lexer**: source text to tokens with line/column positions
//! - **Parser**: recursive descent, tokens to AST
//! - **AST**: node types plus walk / find / stats / validate utilities
//! - **Validation**: structural, per-clause and cross-clause checks
//! - **Interpreter**: AST to a defaulted [`InterpretedQuery`]
//!
//! # Query Language
//!
//! ```text
//! WHERE year = 2024 AND project IN ("Acme", "Globex")
//! SHOW project, SUM(hours) AS "Hours", invoiced
//! GROUP BY project
//! HAVING SUM(hours) > 10
//! ORDER BY hours DESC
//! LIMIT 20
//! VIEW table
//! PERIOD last-6-months
//! ```
//!
//! Keywords are case-insensitive and `//` starts a comment. Conditions can
//! only be combined with AND.
//!
//! # Examples
//!
//! ```rust
//! use timeql::query::{interpret, parse_query, ViewMode};
//!
//! let ast = parse_query(r#"WHERE year = 2024 AND project = "Acme" VIEW table"#)?;
//! let query = interpret(&ast)?;
//!
//! assert_eq!(query.filter().unwrap().year, Some(2024));
//! assert_eq!(query.view(), ViewMode::Table);
//! # Ok::<(), timeql::query::QueryError>(())
//! ```

pub mod ast;
pub mod handlers;
pub mod lexer;
pub mod options;
pub mod token;

mod error;
mod interpreter;
mod parser;
mod validate;

#[cfg(test)]
mod tests;

pub use ast::{Clause, ClauseType, Node, NodeType, Query};
pub use error::{LexError, ParseError, QueryError, QueryResult};
pub use handlers::{ClauseHandler, ClauseRegistry};
pub use interpreter::{
    interpret, DateRangeFilter, HavingCondition, InterpretContext, InterpretedQuery,
    InterpretedQueryBuilder, Interpretation, Interpreter, OrderItemSpec, RetainerSpec,
    RolloverSpec, ShowFieldSpec, ShowSpec, UtilizationSpec, WhereFilter,
};
pub use lexer::tokenize;
pub use options::{
    AggregationFunc, ChartType, Period, RetainerAnalysis, RolloverMode, SizeMode, SortDirection,
    UtilizationMode, ViewMode,
};
pub use parser::{parse_query, Parser};
pub use token::{ComparisonOp, Keyword, Position, Token, TokenKind};
pub use validate::{check_clause_constraints, validate_query, ValidationResult};
