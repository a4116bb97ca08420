//! Cell value formatting
//!
//! A [`Formatter`] turns a raw [`CellValue`] into display text according to
//! a [`FormatKind`] and the active [`FormattingConfig`]. Null values always
//! format to an empty string.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

use crate::config::FormattingConfig;

named_enum! {
    /// How a column's values are rendered
    pub enum FormatKind {
        Currency => "currency",
        Percentage => "percentage",
        Hours => "hours",
        Decimal => "decimal",
        Integer => "integer",
        Date => "date",
        Text => "text",
    }
}

/// A raw value handed to a formatter by the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl CellValue {
    /// Numeric view of the value; numeric text is accepted
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn raw_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Formats values for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Formatter {
    kind: FormatKind,
    #[serde(skip)]
    options: FormattingConfig,
}

impl Formatter {
    pub fn new(kind: FormatKind, options: &FormattingConfig) -> Self {
        Self {
            kind,
            options: options.clone(),
        }
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    /// Format a possibly-missing value
    pub fn format_opt(&self, value: Option<&CellValue>) -> String {
        value.map_or_else(String::new, |v| self.format(v))
    }

    /// Format a value
    pub fn format(&self, value: &CellValue) -> String {
        if matches!(value, CellValue::Null) {
            return String::new();
        }

        match self.kind {
            FormatKind::Currency => self.numeric(value, |n| {
                format_currency(n, &self.options.currency_symbol, self.options.currency_precision)
            }),
            FormatKind::Percentage => self.numeric(value, |n| {
                format_percentage(n, self.options.percentage_precision)
            }),
            FormatKind::Hours => {
                let precision = self.options.hours_precision;
                self.numeric(value, |n| format!("{:.*}h", precision, n))
            }
            FormatKind::Decimal => {
                let precision = self.options.decimal_precision;
                self.numeric(value, |n| format!("{:.*}", precision, n))
            }
            FormatKind::Integer => self.numeric(value, |n| {
                let rounded = format!("{:.0}", n);
                match rounded.strip_prefix('-') {
                    Some(digits) => format!("-{}", group_thousands(digits)),
                    None => group_thousands(&rounded),
                }
            }),
            FormatKind::Date => self.date(value),
            FormatKind::Text => value.raw_text(),
        }
    }

    /// Apply a numeric format, passing non-numeric values through as text
    fn numeric(&self, value: &CellValue, f: impl Fn(f64) -> String) -> String {
        match value.as_number() {
            Some(n) => f(n),
            None => value.raw_text(),
        }
    }

    fn date(&self, value: &CellValue) -> String {
        let date = match value {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        };
        let Some(d) = date else {
            return value.raw_text();
        };

        // chrono reports bad specifiers through fmt::Error
        let mut out = String::new();
        match write!(out, "{}", d.format(&self.options.date_format)) {
            Ok(()) => out,
            Err(_) => value.raw_text(),
        }
    }
}

/// Format a currency amount: `-$1,234.50`
pub fn format_currency(amount: f64, symbol: &str, precision: usize) -> String {
    let fixed = format!("{:.*}", precision, amount.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let sign = if amount < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{}{}.{}", sign, symbol, group_thousands(int_part), frac),
        None => format!("{}{}{}", sign, symbol, group_thousands(int_part)),
    }
}

/// Format a percentage
///
/// Values below 1 are treated as fractions and scaled by 100; values of 1 or
/// more are assumed to already be percentages. `1.0` therefore renders as
/// `1%`, not `100%`.
pub fn format_percentage(value: f64, precision: usize) -> String {
    let scaled = if value < 1.0 { value * 100.0 } else { value };
    format!("{:.*}%", precision, scaled)
}

/// Insert `,` separators into a run of ASCII digits
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
