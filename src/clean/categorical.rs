use crate::data::model::{CellValue, RawTable};

/// Canonical spelling of a categorical label.
pub fn normalize_label(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Trim and upper-case the text cells of each listed column.
/// Absent columns and non-text cells are left alone.
pub fn normalize_categories(mut table: RawTable, columns: &[String]) -> RawTable {
    for column in columns {
        if !table.has_column(column) {
            log::debug!("categorical column '{column}' absent; not normalized");
            continue;
        }
        for rec in &mut table.records {
            if let CellValue::Text(s) = rec.get(column) {
                let normalized = normalize_label(s);
                rec.set(column, CellValue::Text(normalized));
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SalesRecord;

    #[test]
    fn trims_uppercases_and_is_idempotent() {
        let table = RawTable::new(
            vec!["DEALSIZE".into(), "CUSTOMERNAME".into()],
            vec![[
                ("DEALSIZE", CellValue::Text("  Small ".into())),
                ("CUSTOMERNAME", CellValue::Text(" Land of Toys ".into())),
            ]
            .into_iter()
            .collect::<SalesRecord>()],
        );
        let columns = vec!["DEALSIZE".to_string(), "STATUS".to_string()];
        let once = normalize_categories(table, &columns);
        assert_eq!(once.records[0].get("DEALSIZE"), &CellValue::Text("SMALL".into()));
        assert_eq!(
            once.records[0].get("CUSTOMERNAME"),
            &CellValue::Text(" Land of Toys ".into())
        );
        let twice = normalize_categories(once.clone(), &columns);
        assert_eq!(once, twice);
    }
}
