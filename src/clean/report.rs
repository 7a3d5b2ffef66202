use std::fmt;

use serde::Serialize;

/// A recoverable data-quality issue found while cleaning.
///
/// Each warning is logged when recorded and kept on the report so the
/// presentation side can show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleaningWarning {
    /// A numeric column failed strict parsing and was coerced leniently.
    LenientNumeric { column: String, unparsed: usize },
    /// No value of the date column could be parsed.
    UnparseableDates { column: String },
    /// Rows dropped for a missing critical value.
    MissingValues { column: String, removed: usize },
    /// Rows dropped for a zero, negative or missing measure.
    NonPositive { column: String, removed: usize },
    /// Exact duplicate rows dropped.
    Duplicates { removed: usize },
    /// An expected column is absent; the listed feature is skipped.
    ColumnAbsent { column: String, feature: String },
}

impl fmt::Display for CleaningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningWarning::LenientNumeric { column, unparsed } => write!(
                f,
                "column '{column}' is not strictly numeric; coerced leniently ({unparsed} values left missing)"
            ),
            CleaningWarning::UnparseableDates { column } => {
                write!(f, "no value of date column '{column}' could be parsed; date fields not derived")
            }
            CleaningWarning::MissingValues { column, removed } => {
                write!(f, "dropped {removed} rows with missing '{column}'")
            }
            CleaningWarning::NonPositive { column, removed } => {
                write!(f, "dropped {removed} rows with non-positive '{column}'")
            }
            CleaningWarning::Duplicates { removed } => {
                write!(f, "dropped {removed} duplicate rows")
            }
            CleaningWarning::ColumnAbsent { column, feature } => {
                write!(f, "column '{column}' is absent; {feature} skipped")
            }
        }
    }
}

/// Whether the cleaned table can feed the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DataStatus {
    Ready,
    Insufficient(String),
}

/// Everything the pipeline noticed on one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub warnings: Vec<CleaningWarning>,
    /// Features skipped because a column they need is absent.
    pub degraded: Vec<String>,
    pub status: DataStatus,
}

impl Default for CleaningReport {
    fn default() -> Self {
        Self {
            input_rows: 0,
            output_rows: 0,
            warnings: Vec::new(),
            degraded: Vec::new(),
            status: DataStatus::Ready,
        }
    }
}

impl CleaningReport {
    pub fn warn(&mut self, warning: CleaningWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record that `feature` cannot run without `column`.
    pub fn column_absent(&mut self, column: &str, feature: &str) {
        if !self.degraded.iter().any(|f| f == feature) {
            self.degraded.push(feature.to_string());
        }
        self.warn(CleaningWarning::ColumnAbsent {
            column: column.to_string(),
            feature: feature.to_string(),
        });
    }

    /// Mark the data unusable.  The first reason wins.
    pub fn insufficient(&mut self, reason: impl Into<String>) {
        if self.status == DataStatus::Ready {
            let reason = reason.into();
            log::error!("insufficient data: {reason}");
            self.status = DataStatus::Insufficient(reason);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == DataStatus::Ready
    }
}
