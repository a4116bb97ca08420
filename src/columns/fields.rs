//! Field registry
//!
//! Static definitions of every field a report can show, together with the
//! synonyms older queries use for some of them.

use serde::Serialize;
use std::collections::HashMap;

use crate::columns::format::FormatKind;

/// Declared type of a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Currency,
    Percentage,
    Date,
    Text,
    Hours,
}

impl FieldType {
    /// Formatter used when neither the query nor the field overrides it
    pub fn default_format(&self) -> FormatKind {
        match self {
            Self::Number => FormatKind::Decimal,
            Self::Currency => FormatKind::Currency,
            Self::Percentage => FormatKind::Percentage,
            Self::Date => FormatKind::Date,
            Self::Text => FormatKind::Text,
            Self::Hours => FormatKind::Hours,
        }
    }

    /// Default column alignment for this type
    pub fn default_alignment(&self) -> Alignment {
        match self {
            Self::Text | Self::Date => Alignment::Left,
            _ => Alignment::Right,
        }
    }
}

/// Horizontal alignment of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// A known report field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    /// Can be summed/averaged across entries
    pub aggregatable: bool,
    /// Derived from other fields rather than stored on entries
    pub calculable: bool,
    /// Overrides the type's default formatter
    pub format: Option<FormatKind>,
    pub width: Option<u16>,
    pub alignment: Option<Alignment>,
}

impl FieldDefinition {
    /// Create a new field definition
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            aggregatable: false,
            calculable: false,
            format: None,
            width: None,
            alignment: None,
        }
    }

    /// Mark the field as aggregatable
    pub fn aggregatable(mut self) -> Self {
        self.aggregatable = true;
        self
    }

    /// Mark the field as calculated
    pub fn calculable(mut self) -> Self {
        self.calculable = true;
        self
    }

    /// Override the formatter
    pub fn format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the preferred column width
    pub fn width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the column alignment
    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Formatter to use when the query does not request one
    pub fn format_kind(&self) -> FormatKind {
        self.format.unwrap_or_else(|| self.field_type.default_format())
    }
}

/// Lookup table of field definitions and legacy synonyms
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    synonyms: HashMap<String, String>,
}

impl FieldRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            synonyms: HashMap::new(),
        }
    }

    /// The built-in time-entry fields
    pub fn builtin() -> Self {
        use FieldType::*;

        let mut registry = Self::empty();
        for def in [
            FieldDefinition::new("date", "Date", Date).width(12),
            FieldDefinition::new("project", "Project", Text).width(24),
            FieldDefinition::new("client", "Client", Text).width(20),
            FieldDefinition::new("notes", "Notes", Text).width(40),
            FieldDefinition::new("year", "Year", Number).format(FormatKind::Integer).width(6),
            FieldDefinition::new("month", "Month", Text).width(10),
            FieldDefinition::new("week", "Week", Number).format(FormatKind::Integer).width(6),
            FieldDefinition::new("hours", "Hours", Hours).aggregatable().width(10),
            FieldDefinition::new("rate", "Rate", Currency).aggregatable().width(10),
            FieldDefinition::new("invoiced", "Invoiced", Currency)
                .aggregatable()
                .calculable()
                .width(12),
            FieldDefinition::new("entries", "Entries", Number)
                .aggregatable()
                .format(FormatKind::Integer)
                .width(8),
            FieldDefinition::new("budgetHours", "Budget", Hours).aggregatable().width(10),
            FieldDefinition::new("budgetUsed", "Budget Used", Hours)
                .aggregatable()
                .calculable()
                .width(12),
            FieldDefinition::new("budgetRemaining", "Remaining", Hours)
                .aggregatable()
                .calculable()
                .width(12),
            FieldDefinition::new("budgetProgress", "Progress", Percentage)
                .calculable()
                .width(10),
            FieldDefinition::new("utilization", "Utilization", Percentage)
                .calculable()
                .width(12),
            FieldDefinition::new("retainerHours", "Retainer Hours", Hours)
                .aggregatable()
                .width(14),
            FieldDefinition::new("rolloverHours", "Rollover", Hours)
                .aggregatable()
                .calculable()
                .width(10),
        ] {
            registry.register(def);
        }

        for (synonym, key) in [
            ("progress", "budgetProgress"),
            ("budget", "budgetHours"),
            ("remaining", "budgetRemaining"),
            ("used", "budgetUsed"),
            ("revenue", "invoiced"),
            ("earnings", "invoiced"),
            ("util", "utilization"),
            ("count", "entries"),
            ("retainer", "retainerHours"),
            ("rollover", "rolloverHours"),
        ] {
            registry.add_synonym(synonym, key);
        }

        registry
    }

    /// Add or replace a field definition
    pub fn register(&mut self, definition: FieldDefinition) {
        match self.fields.iter_mut().find(|f| f.key == definition.key) {
            Some(existing) => *existing = definition,
            None => self.fields.push(definition),
        }
    }

    /// Map a legacy name onto a registered key
    pub fn add_synonym(&mut self, synonym: impl Into<String>, key: impl Into<String>) {
        self.synonyms
            .insert(synonym.into().to_ascii_lowercase(), key.into());
    }

    /// Look up a field by its exact key
    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Canonical key for a field name as written in a query
    ///
    /// Tries the exact key, then synonyms, then a match ignoring case,
    /// underscores and hyphens (`budget_progress` → `budgetProgress`).
    /// Unknown names are returned unchanged.
    pub fn normalize(&self, name: &str) -> String {
        if self.get(name).is_some() {
            return name.to_string();
        }

        let lower = name.to_ascii_lowercase();
        if let Some(key) = self.synonyms.get(&lower) {
            return key.clone();
        }

        let compact: String = lower.chars().filter(|c| *c != '_' && *c != '-').collect();
        self.fields
            .iter()
            .find(|f| f.key.to_ascii_lowercase() == compact)
            .map(|f| f.key.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Normalize a name and look it up
    pub fn resolve(&self, name: &str) -> Option<&FieldDefinition> {
        self.get(&self.normalize(name))
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_synonyms() {
        let registry = FieldRegistry::builtin();
        assert_eq!(registry.normalize("progress"), "budgetProgress");
        assert_eq!(registry.normalize("Revenue"), "invoiced");
        assert_eq!(registry.normalize("hours"), "hours");
    }

    #[test]
    fn test_normalize_case_and_separators() {
        let registry = FieldRegistry::builtin();
        assert_eq!(registry.normalize("HOURS"), "hours");
        assert_eq!(registry.normalize("budget_progress"), "budgetProgress");
        assert_eq!(registry.normalize("budget-remaining"), "budgetRemaining");
    }

    #[test]
    fn test_unknown_field_is_unchanged() {
        let registry = FieldRegistry::builtin();
        assert_eq!(registry.normalize("invalid_field"), "invalid_field");
        assert!(registry.resolve("invalid_field").is_none());
    }

    #[test]
    fn test_every_synonym_targets_a_field() {
        let registry = FieldRegistry::builtin();
        for key in registry.synonyms.values() {
            assert!(registry.get(key).is_some(), "synonym target {} missing", key);
        }
    }

    #[test]
    fn test_format_kind_prefers_override() {
        let registry = FieldRegistry::builtin();
        assert_eq!(registry.get("entries").unwrap().format_kind(), FormatKind::Integer);
        assert_eq!(registry.get("invoiced").unwrap().format_kind(), FormatKind::Currency);
        assert_eq!(registry.get("rate").unwrap().format_kind(), FormatKind::Currency);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = FieldRegistry::builtin();
        let before = registry.len();
        registry.register(FieldDefinition::new("hours", "Time", FieldType::Hours));
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("hours").unwrap().label, "Time");
    }
}
