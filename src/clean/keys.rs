use crate::config::ColumnContract;
use crate::data::model::{CellValue, RawTable, SalesRecord};

use super::report::CleaningReport;

/// Fill canonical `MONTH_ID` / `YEAR_ID` / `QTR_ID` from the date-derived
/// fields. Existing non-null canonical values are never touched, so running
/// this twice changes nothing.
pub fn backfill_keys(mut table: RawTable, contract: &ColumnContract, report: &mut CleaningReport) -> RawTable {
    for (canonical, derived) in [
        (&contract.month_id, &contract.derived_month),
        (&contract.year_id, &contract.derived_year),
    ] {
        if table.has_column(derived) {
            fill_nulls(&mut table, canonical, |rec| rec.get(derived).clone());
        } else if !table.has_column(canonical) {
            report.column_absent(canonical, &format!("time buckets needing {canonical}"));
        }
    }

    if table.has_column(&contract.month_id) {
        let month_id = contract.month_id.clone();
        fill_nulls(&mut table, &contract.quarter_id, |rec| {
            match rec.get(&month_id).as_i64() {
                Some(m @ 1..=12) => CellValue::Integer((m - 1) / 3 + 1),
                _ => CellValue::Null,
            }
        });
    }
    table
}

fn fill_nulls<F>(table: &mut RawTable, column: &str, source: F)
where
    F: Fn(&SalesRecord) -> CellValue,
{
    let created = !table.has_column(column);
    let mut filled = 0usize;
    for rec in &mut table.records {
        if rec.get(column).is_null() {
            let value = source(&*rec);
            if !value.is_null() {
                filled += 1;
            }
            rec.set(column, value);
        }
    }
    table.add_column(column);
    if created {
        log::info!("derived column '{column}' ({filled} values)");
    } else if filled > 0 {
        log::info!("backfilled {filled} missing '{column}' values");
    }
}
