//! Raw and enriched forms of a signalement record.
//!
//! A load reads cells into a [`RawTable`], then turns each surviving row into an
//! [`EnrichedRecord`]. The resulting [`EnrichedDataset`] is never mutated.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

use crate::schema::ResolvedColumns;

/// Value used when the nature or perimeter is absent or blank
pub const UNDEFINED_LABEL: &str = "Non défini";

/// Subcategory label when the file has no message column
pub const NOT_APPLICABLE_LABEL: &str = "N/A";

/// Subcategory label for records whose nature is not security related
pub const NOT_CONCERNED_LABEL: &str = "Non concerné";

/// A single cell as read from the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl RawValue {
    /// Builds a text value; blank input becomes `Empty`.
    pub fn from_text(value: &str) -> Self {
        if value.is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(value.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for classification, cleaning and export.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Display for RawValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Empty => Ok(()),
            RawValue::Text(text) => write!(f, "{}", text),
            RawValue::Int(value) => write!(f, "{}", value),
            RawValue::Float(value) => write!(f, "{}", value),
            RawValue::Bool(value) => write!(f, "{}", value),
            RawValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            RawValue::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

/// Header plus rows, after skip rows have been applied. Every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<RawValue>) {
        row.resize(self.columns.len(), RawValue::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &RawValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }
}

/// Result of the keyword classifier for one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subcategory {
    /// One of the configured categories, including the catch-all default
    Classified(String),
    /// The file has no message column
    NotApplicable,
    /// The declared nature is outside the security whitelist
    NotConcerned,
}

impl Subcategory {
    pub fn label(&self) -> &str {
        match self {
            Subcategory::Classified(name) => name,
            Subcategory::NotApplicable => NOT_APPLICABLE_LABEL,
            Subcategory::NotConcerned => NOT_CONCERNED_LABEL,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Subcategory::Classified(_))
    }
}

impl Display for Subcategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Subcategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A raw record with the derived columns attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    /// Raw cells, aligned with [`EnrichedDataset::columns`]
    pub values: Vec<RawValue>,
    pub nature: String,
    pub perimeter: String,
    pub timestamp: NaiveDateTime,
    pub weekday_index: u32,
    pub weekday_name: &'static str,
    pub date: NaiveDate,
    pub hour: u32,
    pub subcategory: Subcategory,
}

/// Immutable output of one load. Shared between the cache and its readers.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDataset {
    pub columns: Vec<String>,
    pub resolved: ResolvedColumns,
    pub records: Vec<EnrichedRecord>,
}

impl EnrichedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last calendar day present in the dataset.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_empty() {
        assert!(RawValue::from_text("").is_empty());
        assert!(RawValue::Text("   ".to_string()).is_empty());
        assert!(!RawValue::Int(0).is_empty());
    }

    #[test]
    fn test_to_text_formats() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(RawValue::DateTime(dt).to_text(), "2024-01-05 08:15:00");
        assert_eq!(RawValue::Time(dt.time()).to_text(), "08:15:00");
        assert_eq!(RawValue::Empty.to_text(), "");
        assert_eq!(RawValue::Int(12).to_text(), "12");
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut table = RawTable::new(vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec![RawValue::Int(1)]);
        table.push_row(vec![RawValue::Int(1), RawValue::Int(2), RawValue::Int(3)]);
        assert_eq!(table.rows[0], vec![RawValue::Int(1), RawValue::Empty]);
        assert_eq!(table.rows[1].len(), 2);
    }

    #[test]
    fn test_subcategory_labels() {
        assert_eq!(Subcategory::NotConcerned.label(), "Non concerné");
        assert_eq!(Subcategory::NotApplicable.label(), "N/A");
        let classified = Subcategory::Classified("Dégradation".to_string());
        assert_eq!(classified.to_string(), "Dégradation");
        assert!(classified.is_classified());
        assert!(!Subcategory::NotConcerned.is_classified());
    }
}
