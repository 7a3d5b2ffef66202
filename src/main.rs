use anyhow::Result;
use serde::Serialize;

use sales_lens::clean::report::CleaningReport;
use sales_lens::config::DashboardConfig;
use sales_lens::data::dashboard::Dashboard;
use sales_lens::data::model::SalesRecord;
use sales_lens::state::{DashboardState, DataSource};

const PREVIEW_ROWS: usize = 10;

#[derive(Serialize)]
struct Output<'a> {
    source: String,
    report: Option<&'a CleaningReport>,
    preview: &'a [SalesRecord],
    dashboard: Option<Dashboard>,
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let config = DashboardConfig::from_env()?;
    let source = match std::env::args_os().nth(1) {
        Some(path) => DataSource::Uploaded(path.into()),
        None => DataSource::Default,
    };
    let source_path = source.path(&config).display().to_string();

    let mut state = DashboardState::new(config);
    state.load_source(source)?;

    let (dashboard, error) = match state.dashboard() {
        Ok(d) => (Some(d), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let output = Output {
        source: source_path,
        report: state.report.as_ref(),
        preview: state.preview(PREVIEW_ROWS),
        dashboard,
        error,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
