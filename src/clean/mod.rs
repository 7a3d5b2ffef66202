//! Cleaning pipeline: raw table in, cleaned table plus report out.
//!
//! ```text
//!   RawTable
//!      │
//!      ▼
//!   coerce       numeric columns → Float / Null
//!      │
//!      ▼
//!   dates        ORDERDATE → Date, derive day / weekday / month / year
//!      │
//!      ▼
//!   keys         backfill MONTH_ID / YEAR_ID / QTR_ID
//!      │
//!      ▼
//!   integrity    drop incomplete, non-positive, duplicate rows
//!      │
//!      ▼
//!   categorical  trim + upper-case labels
//!      │
//!      ▼
//!   CleanedTable + CleaningReport
//! ```
//!
//! Stages take a table by value and hand back a new one. Recoverable issues
//! are recorded on the report; nothing in here fails.

pub mod categorical;
pub mod coerce;
pub mod dates;
pub mod integrity;
pub mod keys;
pub mod report;

use crate::config::ColumnContract;
use crate::data::model::{CleanedTable, RawTable};

use report::CleaningReport;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: CleanedTable,
    pub report: CleaningReport,
}

/// Run every stage in order.
pub fn clean(raw: RawTable, contract: &ColumnContract) -> CleanOutcome {
    let mut report = CleaningReport {
        input_rows: raw.len(),
        ..CleaningReport::default()
    };

    let table = coerce::coerce_numeric(raw, &contract.numeric, &mut report);
    let table = dates::normalize_dates(table, contract, &mut report);
    let table = keys::backfill_keys(table, contract, &mut report);
    let table = integrity::enforce_integrity(table, contract, &mut report);
    let table = categorical::normalize_categories(table, &contract.categorical);

    report.output_rows = table.len();
    log::info!(
        "Cleaned {} rows down to {} ({} warnings)",
        report.input_rows,
        report.output_rows,
        report.warnings.len()
    );

    CleanOutcome {
        table: CleanedTable::from_raw(table),
        report,
    }
}
