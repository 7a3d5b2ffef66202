//! Sales dashboard core: load a sales table, clean it, filter it and reduce
//! it to chart-ready views. Drawing is left to the caller.

pub mod clean;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
