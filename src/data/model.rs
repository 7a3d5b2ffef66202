use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the sales table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Used as a `BTreeMap` / `BTreeSet` key downstream, so it must be `Ord`.
/// Equality follows `Ord`: a NaN float equals itself.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    /// Missing value (unparseable number or date, blank cell).
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Date(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interpret the value as an `f64` (numeric cells only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as an integer. Floats with no fractional part are
    /// accepted, which covers identifiers that went through a float column.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SalesRecord – one order line
// ---------------------------------------------------------------------------

static NULL: CellValue = CellValue::Null;

/// One row of the sales table: column name → value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct SalesRecord {
    pub fields: BTreeMap<String, CellValue>,
}

impl SalesRecord {
    pub fn new(fields: BTreeMap<String, CellValue>) -> Self {
        Self { fields }
    }

    /// Value of `column`, `Null` when the row has no such column.
    pub fn get(&self, column: &str) -> &CellValue {
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.fields.insert(column.to_string(), value);
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for SalesRecord {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – loader output, input of the cleaning pipeline
// ---------------------------------------------------------------------------

/// A table as read from disk, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names in file order.
    pub columns: Vec<String>,
    pub records: Vec<SalesRecord>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, records: Vec<SalesRecord>) -> Self {
        Self { columns, records }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Register a column name if it is not known yet (appended at the end).
    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CleanedTable – pipeline output
// ---------------------------------------------------------------------------

/// The cleaned dataset with a pre-computed unique-value index per column.
#[derive(Debug, Clone, Default)]
pub struct CleanedTable {
    pub records: Vec<SalesRecord>,
    /// Column names in file order, derived columns appended.
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl CleanedTable {
    /// Freeze a raw table and build its column index.
    pub fn from_raw(raw: RawTable) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = raw
            .columns
            .iter()
            .map(|c| (c.clone(), BTreeSet::new()))
            .collect();

        for rec in &raw.records {
            for (col, val) in &rec.fields {
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        CleanedTable {
            records: raw.records,
            column_names: raw.columns,
            unique_values,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first_and_floats_use_total_order() {
        let mut set = BTreeSet::new();
        set.insert(CellValue::Text("B".into()));
        set.insert(CellValue::Float(2.5));
        set.insert(CellValue::Null);
        set.insert(CellValue::Float(-1.0));
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(ordered[0], CellValue::Null);
        assert_eq!(ordered[1], CellValue::Float(-1.0));
        assert_eq!(ordered[3], CellValue::Text("B".into()));
    }

    #[test]
    fn nan_cells_equal_themselves() {
        let nan = CellValue::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        let rec: SalesRecord = [("MONTH_ID", nan)].into_iter().collect();
        assert_eq!(rec, rec.clone());
        assert_ne!(CellValue::Float(1.0), CellValue::Integer(1));
    }

    #[test]
    fn missing_column_reads_as_null() {
        let rec: SalesRecord = [("SALES", CellValue::Float(10.0))].into_iter().collect();
        assert_eq!(rec.get("COUNTRY"), &CellValue::Null);
        assert_eq!(rec.number("SALES"), Some(10.0));
    }

    #[test]
    fn integral_floats_read_as_integers() {
        assert_eq!(CellValue::Float(2003.0).as_i64(), Some(2003));
        assert_eq!(CellValue::Float(2003.5).as_i64(), None);
        assert_eq!(CellValue::Text(" 7 ".into()).as_i64(), Some(7));
    }

    #[test]
    fn cleaned_table_indexes_unique_values() {
        let recs = vec![
            [("COUNTRY", CellValue::Text("USA".into()))].into_iter().collect(),
            [("COUNTRY", CellValue::Text("USA".into()))].into_iter().collect(),
            [("COUNTRY", CellValue::Text("FRANCE".into()))].into_iter().collect(),
        ];
        let table = CleanedTable::from_raw(RawTable::new(vec!["COUNTRY".into()], recs));
        assert_eq!(table.len(), 3);
        assert_eq!(table.unique_values["COUNTRY"].len(), 2);
    }
}
