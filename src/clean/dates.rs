use chrono::{Datelike, NaiveDate};

use crate::config::ColumnContract;
use crate::data::model::{CellValue, RawTable};

use super::report::{CleaningReport, CleaningWarning};

/// Day-first layouts, tried before any month-first one.
const DAY_FIRST: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
];

/// Only used when no day-first reading is a valid date.
const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"];

/// Drop a trailing time of day: `"2/24/2003 0:00"`, `"2003-02-24T10:00:00"`,
/// `"2/24/2003 12:00:00 AM"`.
fn strip_time(s: &str) -> &str {
    let s = s.trim();
    if let Some((date, _)) = s.split_once('T').filter(|(d, _)| d.len() == 10) {
        return date;
    }
    let mut end = s;
    while let Some((head, last)) = end.rsplit_once(' ') {
        let is_time = last.contains(':')
            || last.eq_ignore_ascii_case("am")
            || last.eq_ignore_ascii_case("pm");
        if !is_time {
            break;
        }
        end = head.trim_end();
    }
    end
}

/// Permissive date parser, day before month.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = strip_time(raw);
    if s.is_empty() {
        return None;
    }
    DAY_FIRST
        .iter()
        .chain(MONTH_FIRST)
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            // compact yyyymmdd
            (s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()))
                .then(|| NaiveDate::parse_from_str(s, "%Y%m%d").ok())
                .flatten()
        })
}

fn parse_cell(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date(s),
        CellValue::Integer(i) => parse_date(&i.to_string()),
        CellValue::Float(_) | CellValue::Null => None,
    }
}

/// Replace the order date with a parsed `Date` (or `Null`) and derive
/// day / weekday / month / year columns.
///
/// Derivation is skipped, with one warning, when not a single value parses.
pub fn normalize_dates(mut table: RawTable, contract: &ColumnContract, report: &mut CleaningReport) -> RawTable {
    let column = contract.order_date.as_str();
    if !table.has_column(column) {
        report.column_absent(column, "date derivation");
        return table;
    }

    let parsed: Vec<Option<NaiveDate>> = table
        .records
        .iter()
        .map(|rec| parse_cell(rec.get(column)))
        .collect();
    let parsed_count = parsed.iter().filter(|d| d.is_some()).count();
    log::debug!("parsed {parsed_count}/{} order dates", parsed.len());

    for (rec, date) in table.records.iter_mut().zip(&parsed) {
        rec.set(column, date.map(CellValue::Date).unwrap_or(CellValue::Null));
    }

    if parsed_count == 0 {
        report.warn(CleaningWarning::UnparseableDates {
            column: column.to_string(),
        });
        return table;
    }

    for (rec, date) in table.records.iter_mut().zip(parsed) {
        let (day, weekday, month, year) = match date {
            Some(d) => (
                CellValue::Integer(d.day() as i64),
                CellValue::Text(d.format("%A").to_string()),
                CellValue::Integer(d.month() as i64),
                CellValue::Integer(d.year() as i64),
            ),
            None => (CellValue::Null, CellValue::Null, CellValue::Null, CellValue::Null),
        };
        rec.set(&contract.derived_day, day);
        rec.set(&contract.derived_weekday, weekday);
        rec.set(&contract.derived_month, month);
        rec.set(&contract.derived_year, year);
    }
    for derived in [
        &contract.derived_day,
        &contract.derived_weekday,
        &contract.derived_month,
        &contract.derived_year,
    ] {
        table.add_column(derived);
    }
    table
}
