use serde::Serialize;

use super::aggregate::{AggregationView, FilteredSales, GrowthView, HeadlineMetrics, TimeBucket, ViewEntry};
use super::model::CleanedTable;
use crate::config::ColumnContract;
use crate::error::ViewError;

/// A view that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedView {
    pub name: String,
    pub reason: String,
}

/// Everything the presentation layer draws for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub metrics: HeadlineMetrics,
    pub views: Vec<AggregationView>,
    pub growth: Option<GrowthView>,
    pub skipped: Vec<SkippedView>,
}

impl Dashboard {
    pub fn view(&self, name: &str) -> Option<&AggregationView> {
        self.views.iter().find(|v| v.name == name)
    }
}

/// Two years to compare, base first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub base_year: i64,
    pub compared_year: i64,
}

struct Builder {
    views: Vec<AggregationView>,
    skipped: Vec<SkippedView>,
}

impl Builder {
    fn push(&mut self, name: &str, group_by: &str, result: Result<Vec<ViewEntry>, ViewError>) {
        match result {
            Ok(entries) => self.views.push(AggregationView {
                name: name.to_string(),
                group_by: group_by.to_string(),
                entries,
            }),
            Err(e) => self.skip(name, e),
        }
    }

    fn skip(&mut self, name: &str, err: ViewError) {
        log::warn!("view '{name}' skipped: {err}");
        self.skipped.push(SkippedView {
            name: name.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Compute the headline metrics and every named view over `rows`.
pub fn build_dashboard(
    table: &CleanedTable,
    rows: &[usize],
    columns: &ColumnContract,
    top_n: usize,
    comparison: Option<Comparison>,
) -> Dashboard {
    let sales = FilteredSales::new(table, rows, columns);
    let mut b = Builder {
        views: Vec::new(),
        skipped: Vec::new(),
    };

    b.push("sales_by_product_line", &columns.product_line, sales.sales_by(&columns.product_line));
    b.push("sales_by_country", &columns.country, sales.sales_by(&columns.country));
    b.push("top_customers", &columns.customer, sales.top_n(&columns.customer, top_n));
    for bucket in [TimeBucket::Month, TimeBucket::Quarter, TimeBucket::Year] {
        b.push(
            &format!("sales_by_{}", bucket.label()),
            bucket.label(),
            sales.sales_by_period(bucket),
        );
    }

    let growth = comparison.and_then(|c| {
        match sales.growth_by_product_line(c.base_year, c.compared_year) {
            Ok(g) => Some(g),
            Err(e) => {
                b.skip("growth_by_product_line", e);
                None
            }
        }
    });

    Dashboard {
        metrics: sales.metrics(),
        views: b.views,
        growth,
        skipped: b.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, RawTable};

    fn usa_only() -> CleanedTable {
        let records = (0..3)
            .map(|i| {
                [
                    ("ORDERNUMBER", CellValue::Integer(100 + i)),
                    ("CUSTOMERNAME", CellValue::Text(format!("C{i}"))),
                    ("COUNTRY", CellValue::Text("USA".into())),
                    ("PRODUCTLINE", CellValue::Text("TRAINS".into())),
                    ("YEAR_ID", CellValue::Integer(2003 + i)),
                    ("SALES", CellValue::Float(100.0)),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        let columns = ["ORDERNUMBER", "CUSTOMERNAME", "COUNTRY", "PRODUCTLINE", "YEAR_ID", "SALES"]
            .map(String::from)
            .to_vec();
        CleanedTable::from_raw(RawTable::new(columns, records))
    }

    #[test]
    fn views_without_inputs_are_skipped_not_failed() {
        let table = usa_only();
        let rows: Vec<usize> = (0..table.len()).collect();
        let dash = build_dashboard(
            &table,
            &rows,
            &ColumnContract::default(),
            10,
            Some(Comparison { base_year: 2003, compared_year: 2004 }),
        );

        assert_eq!(dash.metrics.total_sales, 300.0);
        assert!(dash.view("sales_by_year").is_some());
        assert!(dash.view("sales_by_month").is_none());
        let skipped: Vec<&str> = dash.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, vec!["sales_by_month", "sales_by_quarter"]);
        let growth = dash.growth.unwrap();
        assert_eq!(growth.rows[0].growth.percent(), Some(0.0));
    }

    #[test]
    fn empty_rows_produce_zero_totals() {
        let table = usa_only();
        let dash = build_dashboard(&table, &[], &ColumnContract::default(), 10, None);
        assert_eq!(dash.metrics.total_sales, 0.0);
        assert_eq!(dash.metrics.mean_order_value, None);
        assert!(dash.view("sales_by_country").unwrap().entries.is_empty());
        assert!(dash.growth.is_none());
    }
}
