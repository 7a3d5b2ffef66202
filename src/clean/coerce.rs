use crate::data::model::{CellValue, RawTable};

use super::report::{CleaningReport, CleaningWarning};

/// Convert every configured numeric column to `Float` / `Null`.
///
/// A column is first parsed strictly (comma read as decimal separator). If
/// any value fails, the whole column is re-read leniently from the original
/// cells instead, with one warning for the column.
pub fn coerce_numeric(mut table: RawTable, columns: &[String], report: &mut CleaningReport) -> RawTable {
    for column in columns {
        if !table.has_column(column) {
            report.column_absent(column, &format!("numeric coercion of {column}"));
            continue;
        }

        let strict: Option<Vec<CellValue>> = table
            .records
            .iter()
            .map(|rec| strict_number(rec.get(column)))
            .collect();

        let coerced = match strict {
            Some(values) => values,
            None => {
                let values: Vec<CellValue> = table
                    .records
                    .iter()
                    .map(|rec| lenient_number(rec.get(column)))
                    .collect();
                let unparsed = table
                    .records
                    .iter()
                    .zip(&values)
                    .filter(|(rec, v)| !rec.get(column).is_null() && v.is_null())
                    .count();
                report.warn(CleaningWarning::LenientNumeric {
                    column: column.clone(),
                    unparsed,
                });
                values
            }
        };

        for (rec, value) in table.records.iter_mut().zip(coerced) {
            rec.set(column, value);
        }
    }
    table
}

fn finite(v: f64) -> CellValue {
    if v.is_finite() {
        CellValue::Float(v)
    } else {
        CellValue::Null
    }
}

/// `None` means the value cannot be read strictly.
pub fn strict_number(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Null => Some(CellValue::Null),
        CellValue::Integer(i) => Some(CellValue::Float(*i as f64)),
        CellValue::Float(f) => Some(finite(*f)),
        CellValue::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok().map(finite),
        CellValue::Date(_) => None,
    }
}

/// Keep only `[0-9.]` and parse; anything still invalid is missing.
pub fn lenient_number(value: &CellValue) -> CellValue {
    match value {
        CellValue::Integer(i) => CellValue::Float(*i as f64),
        CellValue::Float(f) => finite(*f),
        CellValue::Text(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            digits.parse::<f64>().map(finite).unwrap_or(CellValue::Null)
        }
        CellValue::Date(_) | CellValue::Null => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SalesRecord;

    fn table(values: &[CellValue]) -> RawTable {
        let records = values
            .iter()
            .map(|v| [("SALES", v.clone())].into_iter().collect::<SalesRecord>())
            .collect();
        RawTable::new(vec!["SALES".into()], records)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn comma_decimals_parse_strictly_without_warning() {
        let mut report = CleaningReport::default();
        let out = coerce_numeric(
            table(&[text("12,5"), CellValue::Integer(3)]),
            &["SALES".into()],
            &mut report,
        );
        assert_eq!(out.records[0].get("SALES"), &CellValue::Float(12.5));
        assert_eq!(out.records[1].get("SALES"), &CellValue::Float(3.0));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn thousands_separator_falls_back_to_lenient() {
        let mut report = CleaningReport::default();
        let out = coerce_numeric(
            table(&[text("1,234.50"), text("$99"), text("n/a")]),
            &["SALES".into()],
            &mut report,
        );
        assert_eq!(out.records[0].get("SALES"), &CellValue::Float(1234.5));
        assert_eq!(out.records[1].get("SALES"), &CellValue::Float(99.0));
        assert!(out.records[2].get("SALES").is_null());
        assert_eq!(
            report.warnings,
            vec![CleaningWarning::LenientNumeric { column: "SALES".into(), unparsed: 1 }]
        );
    }

    #[test]
    fn lenient_column_drops_minus_signs() {
        let mut report = CleaningReport::default();
        let out = coerce_numeric(
            table(&[text("1,234.50"), text("-5")]),
            &["SALES".into()],
            &mut report,
        );
        assert_eq!(out.records[1].get("SALES"), &CellValue::Float(5.0));
        assert_eq!(report.warnings.len(), 1);

        // Read strictly, the sign survives.
        let mut report = CleaningReport::default();
        let out = coerce_numeric(table(&[text("-5")]), &["SALES".into()], &mut report);
        assert_eq!(out.records[0].get("SALES"), &CellValue::Float(-5.0));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn coercion_is_total() {
        let mut report = CleaningReport::default();
        let inputs = [text(""), text("..."), text("inf"), CellValue::Float(f64::NAN), text("7")];
        let out = coerce_numeric(table(&inputs), &["SALES".into()], &mut report);
        for rec in &out.records {
            match rec.get("SALES") {
                CellValue::Float(f) => assert!(f.is_finite()),
                CellValue::Null => {}
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn absent_column_degrades() {
        let mut report = CleaningReport::default();
        coerce_numeric(table(&[]), &["MSRP".into()], &mut report);
        assert_eq!(report.degraded.len(), 1);
    }
}
