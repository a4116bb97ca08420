//! Column mapper
//!
//! Maps SHOW fields onto display column descriptors. Field names are
//! normalized through the [`FieldRegistry`]; unknown fields are skipped with
//! a warning, so every descriptor's key is a registered field.

use serde::Serialize;
use std::sync::Arc;

use crate::columns::fields::{Alignment, FieldDefinition, FieldRegistry};
use crate::columns::format::{CellValue, FormatKind, Formatter};
use crate::config::FormattingConfig;
use crate::query::ast::ShowClause;
use crate::query::ShowSpec;
use crate::query::options::AggregationFunc;

/// How one output column is labeled, laid out and formatted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationFunc>,
    pub formatter: Formatter,
}

impl ColumnDescriptor {
    /// Format a cell of this column
    pub fn format(&self, value: &CellValue) -> String {
        self.formatter.format(value)
    }
}

/// Descriptors plus the warnings raised while mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedColumns {
    pub columns: Vec<ColumnDescriptor>,
    pub warnings: Vec<String>,
}

/// A SHOW field reduced to what the mapper needs
struct FieldRef<'a> {
    name: &'a str,
    aggregation: Option<AggregationFunc>,
    alias: Option<&'a str>,
    format: Option<FormatKind>,
}

/// Builds column descriptors for SHOW fields
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    fields: Arc<FieldRegistry>,
    formatting: FormattingConfig,
}

impl ColumnMapper {
    pub fn new(fields: Arc<FieldRegistry>, formatting: FormattingConfig) -> Self {
        Self { fields, formatting }
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    /// Map a SHOW clause, discarding warnings
    pub fn map_fields(&self, show: &ShowClause) -> Vec<ColumnDescriptor> {
        self.map_fields_with_warnings(show).columns
    }

    /// Map a SHOW clause
    pub fn map_fields_with_warnings(&self, show: &ShowClause) -> MappedColumns {
        let refs = show.fields.iter().filter_map(|f| {
            Some(FieldRef {
                name: f.field_name()?,
                aggregation: f.aggregation(),
                alias: f.alias.as_deref(),
                format: f.format,
            })
        });
        self.map_refs(refs)
    }

    /// Map the SHOW part of an interpreted query
    pub fn map_spec(&self, show: &ShowSpec) -> MappedColumns {
        let refs = show.fields.iter().map(|f| FieldRef {
            name: &f.field,
            aggregation: f.aggregation,
            alias: f.alias.as_deref(),
            format: f.format,
        });
        self.map_refs(refs)
    }

    fn map_refs<'a>(&self, refs: impl Iterator<Item = FieldRef<'a>>) -> MappedColumns {
        let mut mapped = MappedColumns::default();

        for field in refs {
            let key = self.fields.normalize(field.name);
            let Some(definition) = self.fields.get(&key) else {
                let warning = format!("Unknown field '{}' skipped", field.name);
                tracing::warn!("{}", warning);
                mapped.warnings.push(warning);
                continue;
            };

            let aggregation = match field.aggregation {
                Some(function) if !definition.aggregatable => {
                    let warning = format!(
                        "{} is not aggregatable; ignoring {}()",
                        definition.key,
                        function.as_str().to_uppercase()
                    );
                    tracing::warn!("{}", warning);
                    mapped.warnings.push(warning);
                    None
                }
                other => other,
            };

            mapped
                .columns
                .push(self.describe(definition, aggregation, field.alias, field.format));
        }

        tracing::debug!(columns = mapped.columns.len(), "Mapped SHOW fields");
        mapped
    }

    fn describe(
        &self,
        definition: &FieldDefinition,
        aggregation: Option<AggregationFunc>,
        alias: Option<&str>,
        format: Option<FormatKind>,
    ) -> ColumnDescriptor {
        let label = match (alias, aggregation) {
            (Some(alias), _) => alias.to_string(),
            (None, Some(function)) => format!(
                "{} ({})",
                definition.label,
                function.as_str().to_uppercase()
            ),
            (None, None) => definition.label.clone(),
        };

        let kind = match (format, aggregation) {
            (Some(kind), _) => kind,
            (None, Some(AggregationFunc::Count)) => FormatKind::Integer,
            (None, _) => definition.format_kind(),
        };

        ColumnDescriptor {
            key: definition.key.clone(),
            label,
            width: definition.width,
            alignment: Some(
                definition
                    .alignment
                    .unwrap_or_else(|| definition.field_type.default_alignment()),
            ),
            aggregation,
            formatter: Formatter::new(kind, &self.formatting),
        }
    }
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(Arc::new(FieldRegistry::builtin()), FormattingConfig::default())
    }
}
