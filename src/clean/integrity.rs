use std::collections::HashSet;

use crate::config::ColumnContract;
use crate::data::model::{RawTable, SalesRecord};

use super::report::{CleaningReport, CleaningWarning};

/// Drop incomplete, non-positive and duplicate rows, in that order.
///
/// Every removal is reported. A critical column missing from the header
/// marks the data insufficient; an empty result does too.
pub fn enforce_integrity(table: RawTable, contract: &ColumnContract, report: &mut CleaningReport) -> RawTable {
    let RawTable { columns, mut records } = table;
    let has = |c: &str| columns.iter().any(|x| x == c);

    for column in &contract.critical {
        if !has(column) {
            report.column_absent(column, "dashboard");
            report.insufficient(format!("critical column '{column}' is absent"));
            continue;
        }
        let removed = retain_counting(&mut records, |rec| !rec.get(column).is_null());
        if removed > 0 {
            report.warn(CleaningWarning::MissingValues {
                column: column.clone(),
                removed,
            });
        }
    }

    for column in [&contract.quantity, &contract.sales] {
        if !has(column) {
            continue;
        }
        let removed = retain_counting(&mut records, |rec| rec.number(column).is_some_and(|v| v > 0.0));
        if removed > 0 {
            report.warn(CleaningWarning::NonPositive {
                column: column.clone(),
                removed,
            });
        }
    }

    let (records, removed) = dedup(records);
    if removed > 0 {
        report.warn(CleaningWarning::Duplicates { removed });
    }

    if records.is_empty() {
        report.insufficient("no rows left after cleaning");
    }
    RawTable::new(columns, records)
}

fn retain_counting<F>(records: &mut Vec<SalesRecord>, keep: F) -> usize
where
    F: Fn(&SalesRecord) -> bool,
{
    let before = records.len();
    records.retain(|rec| keep(rec));
    before - records.len()
}

/// Keep the first occurrence of every fully identical row.
pub fn dedup(records: Vec<SalesRecord>) -> (Vec<SalesRecord>, usize) {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().map(|rec| seen.insert(rec)).collect()
    };
    let before = records.len();
    let unique: Vec<SalesRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(rec, k)| k.then_some(rec))
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}
