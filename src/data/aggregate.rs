use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::model::{CellValue, CleanedTable, SalesRecord};
use crate::config::ColumnContract;
use crate::error::ViewError;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// One bar / point of a chart: grouping key → summed sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEntry {
    pub key: CellValue,
    pub value: f64,
}

/// A named, chart-ready grouping of the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationView {
    pub name: String,
    /// Column (or time bucket) the rows were grouped by.
    pub group_by: String,
    pub entries: Vec<ViewEntry>,
}

impl AggregationView {
    pub fn get(&self, key: &CellValue) -> Option<f64> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Month,
    Quarter,
    Year,
}

impl TimeBucket {
    pub fn label(self) -> &'static str {
        match self {
            TimeBucket::Month => "month",
            TimeBucket::Quarter => "quarter",
            TimeBucket::Year => "year",
        }
    }
}

/// Year-over-year change. `Undefined` when the base year has no sales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GrowthRate {
    Percent(f64),
    Undefined,
}

impl GrowthRate {
    pub fn between(base: f64, current: f64) -> Self {
        if base == 0.0 {
            GrowthRate::Undefined
        } else {
            GrowthRate::Percent((current - base) / base * 100.0)
        }
    }

    pub fn percent(self) -> Option<f64> {
        match self {
            GrowthRate::Percent(p) => Some(p),
            GrowthRate::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    pub product_line: CellValue,
    pub base_sales: f64,
    pub compared_sales: f64,
    pub growth: GrowthRate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthView {
    pub base_year: i64,
    pub compared_year: i64,
    pub rows: Vec<GrowthRow>,
}

/// Single-number dashboard metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub rows: usize,
    pub total_sales: f64,
    pub total_quantity: f64,
    /// Mean `SALES` per order line.
    pub mean_line_value: Option<f64>,
    pub distinct_orders: usize,
    pub distinct_customers: usize,
    /// Sales summed per order number, then averaged over orders.
    pub mean_order_value: Option<f64>,
}

// ---------------------------------------------------------------------------
// FilteredSales – the rows one render pass works on
// ---------------------------------------------------------------------------

/// Read-only view of the rows selected by a filter.
pub struct FilteredSales<'a> {
    table: &'a CleanedTable,
    rows: &'a [usize],
    columns: &'a ColumnContract,
}

fn mean(sum: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| sum / n as f64)
}

fn by_sales_desc(a: &ViewEntry, b: &ViewEntry) -> std::cmp::Ordering {
    b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key))
}

impl<'a> FilteredSales<'a> {
    pub fn new(table: &'a CleanedTable, rows: &'a [usize], columns: &'a ColumnContract) -> Self {
        Self { table, rows, columns }
    }

    fn records(&self) -> impl Iterator<Item = &'a SalesRecord> + 'a {
        let (table, rows) = (self.table, self.rows);
        rows.iter().filter_map(move |&i| table.records.get(i))
    }

    fn sales(&self, rec: &SalesRecord) -> f64 {
        rec.number(&self.columns.sales).unwrap_or(0.0)
    }

    fn require(&self, column: &str) -> Result<(), ViewError> {
        if self.table.has_column(column) {
            Ok(())
        } else {
            Err(ViewError::MissingColumn(column.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_sales(&self) -> f64 {
        self.records().map(|r| self.sales(r)).sum()
    }

    pub fn total_quantity(&self) -> f64 {
        self.records()
            .filter_map(|r| r.number(&self.columns.quantity))
            .sum()
    }

    pub fn mean_line_value(&self) -> Option<f64> {
        mean(self.total_sales(), self.len())
    }

    fn distinct(&self, column: &str) -> usize {
        self.records()
            .map(|r| r.get(column))
            .filter(|v| !v.is_null())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn distinct_orders(&self) -> usize {
        self.distinct(&self.columns.order_number)
    }

    pub fn distinct_customers(&self) -> usize {
        self.distinct(&self.columns.customer)
    }

    pub fn mean_order_value(&self) -> Option<f64> {
        let mut per_order: HashMap<&CellValue, f64> = HashMap::new();
        for rec in self.records() {
            let order = rec.get(&self.columns.order_number);
            if order.is_null() {
                continue;
            }
            *per_order.entry(order).or_default() += self.sales(rec);
        }
        mean(per_order.values().sum(), per_order.len())
    }

    pub fn metrics(&self) -> HeadlineMetrics {
        HeadlineMetrics {
            rows: self.len(),
            total_sales: self.total_sales(),
            total_quantity: self.total_quantity(),
            mean_line_value: self.mean_line_value(),
            distinct_orders: self.distinct_orders(),
            distinct_customers: self.distinct_customers(),
            mean_order_value: self.mean_order_value(),
        }
    }

    /// Sales summed per value of `column`, highest first.  Rows with a
    /// missing key are left out.
    pub fn sales_by(&self, column: &str) -> Result<Vec<ViewEntry>, ViewError> {
        self.require(column)?;
        let mut groups: BTreeMap<&CellValue, f64> = BTreeMap::new();
        for rec in self.records() {
            let key = rec.get(column);
            if key.is_null() {
                continue;
            }
            *groups.entry(key).or_default() += self.sales(rec);
        }
        let mut entries: Vec<ViewEntry> = groups
            .into_iter()
            .map(|(key, value)| ViewEntry { key: key.clone(), value })
            .collect();
        entries.sort_by(by_sales_desc);
        Ok(entries)
    }

    /// Leaderboard: the `n` largest groups of `column`, highest first.
    pub fn top_n(&self, column: &str, n: usize) -> Result<Vec<ViewEntry>, ViewError> {
        let mut entries = self.sales_by(column)?;
        entries.truncate(n);
        Ok(entries)
    }

    /// Sales per period, oldest first. Keys: `YYYYMM`, `YYYYTq`, `YYYY`.
    pub fn sales_by_period(&self, bucket: TimeBucket) -> Result<Vec<ViewEntry>, ViewError> {
        let year_col = &self.columns.year_id;
        self.require(year_col)?;
        let part_col = match bucket {
            TimeBucket::Month => Some(&self.columns.month_id),
            TimeBucket::Quarter => Some(&self.columns.quarter_id),
            TimeBucket::Year => None,
        };
        if let Some(col) = part_col {
            self.require(col)?;
        }

        let mut groups: BTreeMap<String, f64> = BTreeMap::new();
        for rec in self.records() {
            let Some(year) = rec.get(year_col).as_i64() else {
                continue;
            };
            let part = part_col.map(|c| rec.get(c).as_i64());
            let key = match (bucket, part) {
                (TimeBucket::Month, Some(Some(m))) => format!("{year}{m:02}"),
                (TimeBucket::Quarter, Some(Some(q))) => format!("{year}T{q}"),
                (TimeBucket::Year, None) => year.to_string(),
                _ => continue,
            };
            *groups.entry(key).or_default() += self.sales(rec);
        }
        Ok(groups
            .into_iter()
            .map(|(key, value)| ViewEntry { key: CellValue::Text(key), value })
            .collect())
    }

    fn sales_by_line_in_year(&self, year: i64) -> BTreeMap<&'a CellValue, f64> {
        let mut groups = BTreeMap::new();
        for rec in self.records() {
            if rec.get(&self.columns.year_id).as_i64() != Some(year) {
                continue;
            }
            let line = rec.get(&self.columns.product_line);
            if line.is_null() {
                continue;
            }
            *groups.entry(line).or_default() += self.sales(rec);
        }
        groups
    }

    /// Per product line, percentage change of sales from `base_year` to
    /// `compared_year`.  Lines absent from one year count as zero there.
    pub fn growth_by_product_line(&self, base_year: i64, compared_year: i64) -> Result<GrowthView, ViewError> {
        self.require(&self.columns.year_id)?;
        self.require(&self.columns.product_line)?;

        let base = self.sales_by_line_in_year(base_year);
        let compared = self.sales_by_line_in_year(compared_year);
        let mut lines: Vec<&CellValue> = base.keys().chain(compared.keys()).copied().collect();
        lines.sort();
        lines.dedup();

        let rows = lines
            .into_iter()
            .map(|line| {
                let base_sales = base.get(line).copied().unwrap_or(0.0);
                let compared_sales = compared.get(line).copied().unwrap_or(0.0);
                GrowthRow {
                    product_line: line.clone(),
                    base_sales,
                    compared_sales,
                    growth: GrowthRate::between(base_sales, compared_sales),
                }
            })
            .collect();

        Ok(GrowthView {
            base_year,
            compared_year,
            rows,
        })
    }
}
