use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{CellValue, CleanedTable, SalesRecord};
use crate::clean::categorical::normalize_label;

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Inclusive numeric bounds; an open side is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn contains(&self, v: f64) -> bool {
        self.min.map_or(true, |lo| v >= lo) && self.max.map_or(true, |hi| v <= hi)
    }
}

/// Per-column selection state.
///
/// A column absent from `accepted` is unconstrained ("all"); an empty set
/// accepts nothing. Text is compared trimmed and upper-cased, so `"Small"`
/// selects the cleaned `"SMALL"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    accepted: BTreeMap<String, BTreeSet<CellValue>>,
    ranges: BTreeMap<String, NumericRange>,
}

/// Form used for comparisons: labels normalized, integral floats as integers.
fn canonical(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(normalize_label(&s)),
        CellValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(f as i64)
        }
        other => other,
    }
}

impl FilterSelection {
    /// Accept every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSelection::accept`].
    pub fn with<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = CellValue>,
    {
        self.accept(column, values);
        self
    }

    /// Replace the accepted set of `column`.
    pub fn accept<I>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = CellValue>,
    {
        self.accepted
            .insert(column.to_string(), values.into_iter().map(canonical).collect());
    }

    /// Remove any constraint on `column`.
    pub fn clear(&mut self, column: &str) {
        self.accepted.remove(column);
        self.ranges.remove(column);
    }

    /// Add or remove one value from a column's accepted set.
    /// Toggling an unconstrained column starts from `all_values`.
    pub fn toggle(&mut self, column: &str, value: &CellValue, all_values: &BTreeSet<CellValue>) {
        let value = canonical(value.clone());
        let selected = self
            .accepted
            .entry(column.to_string())
            .or_insert_with(|| all_values.iter().cloned().map(canonical).collect());
        if !selected.remove(&value) {
            selected.insert(value);
        }
    }

    pub fn set_range(&mut self, column: &str, range: NumericRange) {
        self.ranges.insert(column.to_string(), range);
    }

    pub fn accepted(&self, column: &str) -> Option<&BTreeSet<CellValue>> {
        self.accepted.get(column)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.accepted.is_empty() && self.ranges.is_empty()
    }

    /// Whether a single row passes every constraint.
    pub fn matches(&self, rec: &SalesRecord) -> bool {
        let sets_pass = self.accepted.iter().all(|(col, selected)| {
            if selected.is_empty() {
                // Nothing selected for this column → hide everything
                return false;
            }
            selected.contains(&canonical(rec.get(col).clone()))
        });
        sets_pass
            && self
                .ranges
                .iter()
                .all(|(col, range)| rec.number(col).is_some_and(|v| range.contains(v)))
    }
}

/// Return indices of rows that pass all active filters.
pub fn filtered_indices(table: &CleanedTable, selection: &FilterSelection) -> Vec<usize> {
    if selection.is_unconstrained() {
        return (0..table.len()).collect();
    }
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| selection.matches(rec))
        .map(|(i, _)| i)
        .collect()
}
