//! Display columns
//!
//! Turns SHOW fields into typed column descriptors:
//!
//! - **Fields**: registry of known report fields and their legacy synonyms
//! - **Format**: value formatters (currency, percentage, hours, ...)
//! - **Mapper**: SHOW clause to [`ColumnDescriptor`] list
//!
//! # Example
//!
//! ```rust
//! use timeql::columns::{CellValue, ColumnMapper};
//! use timeql::query::{parse_query, ast::Clause};
//!
//! let query = parse_query("SHOW hours, invalid_field, invoiced").unwrap();
//! let Clause::Show(show) = &query.clauses[0] else { unreachable!() };
//!
//! let columns = ColumnMapper::default().map_fields(show);
//! assert_eq!(columns.len(), 2);
//! assert_eq!(columns[1].format(&CellValue::from(1250.0)), "$1,250.00");
//! ```

mod fields;
mod format;
mod mapper;

pub use fields::{Alignment, FieldDefinition, FieldRegistry, FieldType};
pub use format::{format_currency, format_percentage, CellValue, FormatKind, Formatter};
pub use mapper::{ColumnDescriptor, ColumnMapper, MappedColumns};
