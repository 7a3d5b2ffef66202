//! Data layer: core types, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet / .xlsx
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RawTable
//!   └──────────┘
//!        │
//!        ▼  (crate::clean)
//!   ┌──────────────┐
//!   │ CleanedTable  │  Vec<SalesRecord>, unique-value index
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  FilterSelection → row indices
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────────────┐
//!   │ aggregate / dashboard │  metrics + chart-ready views
//!   └──────────────────────┘
//! ```

pub mod aggregate;
pub mod dashboard;
pub mod filter;
pub mod loader;
pub mod model;
