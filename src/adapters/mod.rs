//! Concrete implementations of the port traits.

pub mod file_config_adapter;
pub mod json_report;
pub mod price_csv;
pub mod text_report;
pub mod transactions_csv;

#[cfg(feature = "sqlite")]
pub mod sqlite_price_adapter;
