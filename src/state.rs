use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::clean::report::{CleaningReport, DataStatus};
use crate::clean::{CleanOutcome, clean};
use crate::config::DashboardConfig;
use crate::data::dashboard::{Comparison, Dashboard, build_dashboard};
use crate::data::filter::{FilterSelection, NumericRange, filtered_indices};
use crate::data::loader::load_file;
use crate::data::model::{CellValue, CleanedTable, SalesRecord};
use crate::error::ViewError;

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

/// Which file feeds the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// The bundled dataset from the config.
    Default,
    /// A file supplied by the user.
    Uploaded(PathBuf),
}

impl DataSource {
    pub fn path<'a>(&'a self, config: &'a DashboardConfig) -> &'a Path {
        match self {
            DataSource::Default => &config.default_dataset,
            DataSource::Uploaded(path) => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct DashboardState {
    pub config: DashboardConfig,

    /// Where the current table came from.
    pub source: Option<DataSource>,

    /// Cleaned table (None until a source is loaded).
    pub table: Option<CleanedTable>,

    /// What the cleaning pipeline reported for `table`.
    pub report: Option<CleaningReport>,

    /// Active filter selections.
    pub filters: FilterSelection,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Years for the growth view.
    pub comparison: Option<Comparison>,

    /// Status / error message for the UI.
    pub status_message: Option<String>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            source: None,
            table: None,
            report: None,
            filters: FilterSelection::all(),
            visible_indices: Vec::new(),
            comparison: None,
            status_message: None,
        }
    }

    /// Load and clean `source`.  Whatever source is selected is the one
    /// cleaned; on failure the previous table stays in place.
    pub fn load_source(&mut self, source: DataSource) -> Result<()> {
        let path = source.path(&self.config).to_path_buf();
        match load_file(&path) {
            Ok(raw) => {
                let outcome = clean(raw, &self.config.columns);
                self.set_table(outcome);
                self.source = Some(source);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                Err(e)
            }
        }
    }

    /// Ingest a freshly cleaned table and reset filters.
    pub fn set_table(&mut self, outcome: CleanOutcome) {
        let CleanOutcome { table, report } = outcome;
        self.filters = FilterSelection::all();
        self.visible_indices = (0..table.len()).collect();
        self.comparison = self.latest_two_years(&table);
        self.status_message = match &report.status {
            DataStatus::Ready => None,
            DataStatus::Insufficient(reason) => {
                Some(format!("Insufficient data: {reason}"))
            }
        };
        self.table = Some(table);
        self.report = Some(report);
    }

    /// Default comparison: the two most recent years in the table.
    fn latest_two_years(&self, table: &CleanedTable) -> Option<Comparison> {
        let years = table.unique_values.get(&self.config.columns.year_id)?;
        let mut ids = years.iter().filter_map(CellValue::as_i64).rev();
        let compared_year = ids.next()?;
        let base_year = ids.next()?;
        Some(Comparison {
            base_year,
            compared_year,
        })
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.visible_indices = filtered_indices(table, &self.filters);
        }
    }

    /// Sorted options for a filter widget.
    pub fn filter_options(&self, column: &str) -> Vec<CellValue> {
        self.table
            .as_ref()
            .and_then(|t| t.unique_values.get(column))
            .map(|vals| vals.iter().filter(|v| !v.is_null()).cloned().collect())
            .unwrap_or_default()
    }

    /// First `n` cleaned rows, ignoring filters.
    pub fn preview(&self, n: usize) -> &[SalesRecord] {
        self.table
            .as_ref()
            .map(|t| &t.records[..n.min(t.len())])
            .unwrap_or_default()
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        if let Some(all_vals) = self.table.as_ref().and_then(|t| t.unique_values.get(column)) {
            self.filters.toggle(column, value, all_vals);
            self.refilter();
        }
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        self.filters.clear(column);
        self.refilter();
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.filters.accept(column, []);
        self.refilter();
    }

    /// Accept exactly the given values for a column.
    pub fn select_only<I>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = CellValue>,
    {
        self.filters.accept(column, values);
        self.refilter();
    }

    pub fn set_range(&mut self, column: &str, range: NumericRange) {
        self.filters.set_range(column, range);
        self.refilter();
    }

    pub fn set_comparison(&mut self, base_year: i64, compared_year: i64) {
        self.comparison = Some(Comparison {
            base_year,
            compared_year,
        });
    }

    /// Dashboard for the visible rows.  Fails only when the cleaned data
    /// cannot feed any view.
    pub fn dashboard(&self) -> Result<Dashboard, ViewError> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| ViewError::InsufficientData("no dataset loaded".into()))?;
        if let Some(DataStatus::Insufficient(reason)) =
            self.report.as_ref().map(|r| &r.status)
        {
            return Err(ViewError::InsufficientData(reason.clone()));
        }
        Ok(build_dashboard(
            table,
            &self.visible_indices,
            &self.config.columns,
            self.config.top_n,
            self.comparison,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
ORDERNUMBER,ORDERDATE,CUSTOMERNAME,COUNTRY,PRODUCTLINE,DEALSIZE,QUANTITYORDERED,SALES,YEAR_ID,MONTH_ID
1,1/1/2003,Acme,USA,Trains,Small,1,1000,2003,1
2,1/1/2004,Acme,USA,Trains,Medium,1,1200,2004,1
3,1/2/2004,Bolt,USA,Planes,Small,1,300,2004,2
";

    fn loaded() -> (DashboardState, tempfile::NamedTempFile) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        let mut state = DashboardState::new(DashboardConfig::default());
        state
            .load_source(DataSource::Uploaded(file.path().to_path_buf()))
            .unwrap();
        (state, file)
    }

    #[test]
    fn uploaded_source_is_the_one_cleaned() {
        let (state, _file) = loaded();
        assert!(matches!(state.source, Some(DataSource::Uploaded(_))));
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert_eq!(
            state.comparison,
            Some(Comparison { base_year: 2003, compared_year: 2004 })
        );
        let dash = state.dashboard().unwrap();
        assert_eq!(dash.metrics.total_sales, 2500.0);
        let trains = &dash.growth.unwrap().rows[1];
        assert_eq!(trains.product_line, CellValue::Text("TRAINS".into()));
        assert!((trains.growth.percent().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn filter_changes_recompute_views() {
        let (mut state, _file) = loaded();
        state.select_only("DEALSIZE", [CellValue::Text("Small".into())]);
        assert_eq!(state.visible_indices, vec![0, 2]);
        assert_eq!(state.dashboard().unwrap().metrics.total_sales, 1300.0);

        state.select_only("COUNTRY", [CellValue::Text("FRANCE".into())]);
        let dash = state.dashboard().unwrap();
        assert_eq!(dash.metrics.total_sales, 0.0);

        state.select_all("COUNTRY");
        state.select_all("DEALSIZE");
        assert_eq!(state.visible_indices.len(), 3);

        state.select_none("YEAR_ID");
        assert!(state.visible_indices.is_empty());
    }

    #[test]
    fn filter_options_are_sorted_unique_values() {
        let (state, _file) = loaded();
        assert_eq!(
            state.filter_options("YEAR_ID"),
            vec![CellValue::Integer(2003), CellValue::Integer(2004)]
        );
    }

    #[test]
    fn bundled_dataset_cleans_to_a_ready_table() {
        let mut state = DashboardState::new(DashboardConfig::default());
        state.load_source(DataSource::Default).unwrap();
        let report = state.report.as_ref().unwrap();
        assert!(report.is_ready());
        assert!(report.output_rows < report.input_rows);

        let table = state.table.as_ref().unwrap();
        for rec in &table.records {
            assert!(rec.number("QUANTITYORDERED").unwrap() > 0.0);
            assert!(rec.number("SALES").unwrap() > 0.0);
            assert!(!rec.get("CUSTOMERNAME").is_null());
        }
        let dash = state.dashboard().unwrap();
        assert!(dash.skipped.is_empty());
        assert!(dash.view("top_customers").unwrap().entries.len() <= 10);
        assert!(dash.growth.is_some());
    }

    #[test]
    fn preview_shows_leading_rows_regardless_of_filters() {
        let (mut state, _file) = loaded();
        state.select_none("YEAR_ID");
        let head = state.preview(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head[0].get("ORDERNUMBER"), &CellValue::Integer(1));
        assert_eq!(state.preview(10).len(), 3);
        assert!(DashboardState::new(DashboardConfig::default()).preview(10).is_empty());
    }

    #[test]
    fn missing_file_keeps_state_and_sets_status() {
        let mut state = DashboardState::new(DashboardConfig::default());
        let missing = DataSource::Uploaded(PathBuf::from("/nonexistent/sales.csv"));
        assert!(state.load_source(missing).is_err());
        assert!(state.table.is_none());
        assert!(state.status_message.is_some());
        assert!(matches!(state.dashboard(), Err(ViewError::InsufficientData(_))));
    }
}
