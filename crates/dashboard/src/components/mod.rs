//! Reusable page components.

pub mod data_table;

pub use data_table::{DataTableConfig, FilterOption, TableColumn, TableFilter};
