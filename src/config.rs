use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable pointing at an optional JSON config file.
pub const CONFIG_ENV: &str = "SALES_LENS_CONFIG";

/// Dataset used when the user does not supply one.
pub const DEFAULT_DATASET: &str = "data/sales_data_sample.csv";

// ---------------------------------------------------------------------------
// Column contract
// ---------------------------------------------------------------------------

/// Names of the columns each pipeline stage reads or writes.
///
/// The defaults follow the classic `sales_data_sample.csv` layout. Every
/// field can be overridden from the JSON config, partially: missing keys
/// keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnContract {
    pub order_number: String,
    pub order_date: String,
    pub customer: String,
    pub country: String,
    pub product_line: String,
    pub quantity: String,
    pub sales: String,

    /// Canonical time identifiers.
    pub month_id: String,
    pub year_id: String,
    pub quarter_id: String,

    /// Fields derived from the parsed order date.
    pub derived_day: String,
    pub derived_weekday: String,
    pub derived_month: String,
    pub derived_year: String,

    /// Columns coerced to numbers.
    pub numeric: Vec<String>,
    /// Rows missing any of these are dropped.
    pub critical: Vec<String>,
    /// Text columns trimmed and upper-cased.
    pub categorical: Vec<String>,
}

impl Default for ColumnContract {
    fn default() -> Self {
        let names = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            order_number: "ORDERNUMBER".into(),
            order_date: "ORDERDATE".into(),
            customer: "CUSTOMERNAME".into(),
            country: "COUNTRY".into(),
            product_line: "PRODUCTLINE".into(),
            quantity: "QUANTITYORDERED".into(),
            sales: "SALES".into(),
            month_id: "MONTH_ID".into(),
            year_id: "YEAR_ID".into(),
            quarter_id: "QTR_ID".into(),
            derived_day: "ORDER_DAY".into(),
            derived_weekday: "ORDER_WEEKDAY".into(),
            derived_month: "ORDER_MONTH".into(),
            derived_year: "ORDER_YEAR".into(),
            numeric: names(&["QUANTITYORDERED", "PRICEEACH", "SALES", "MSRP"]),
            critical: names(&["ORDERNUMBER", "CUSTOMERNAME", "PRODUCTLINE", "SALES"]),
            categorical: names(&["PRODUCTLINE", "STATUS", "DEALSIZE", "COUNTRY", "TERRITORY"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset loaded when no file is supplied.
    pub default_dataset: PathBuf,
    /// Size of leaderboard views.
    pub top_n: usize,
    pub columns: ColumnContract,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_dataset: PathBuf::from(DEFAULT_DATASET),
            top_n: 10,
            columns: ColumnContract::default(),
        }
    }
}

impl DashboardConfig {
    /// Read and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DashboardConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Config from `$SALES_LENS_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::info!("Loading config from {}", Path::new(&path).display());
                Self::from_file(Path::new(&path))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".into()));
        }
        if self.columns.critical.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one critical column is required".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "top_n": 5, "columns": {{ "sales": "AMOUNT" }} }}"#).unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.columns.sales, "AMOUNT");
        assert_eq!(config.columns.order_number, "ORDERNUMBER");
        assert_eq!(config.default_dataset, PathBuf::from(DEFAULT_DATASET));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "top_n": 0 }}"#).unwrap();
        assert!(matches!(
            DashboardConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            DashboardConfig::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
