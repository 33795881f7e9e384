//! Price-history CSV import.
//!
//! Reads `ticker,date,price` files (one row per quote, many tickers per
//! file) for loading into the price store.

use std::path::Path;

use chrono::NaiveDate;

use crate::domain::error::LotfolioError;

/// A single quote: one ticker, one day, one closing price.
#[derive(Debug, Clone)]
pub struct PriceRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<PriceRow>, LotfolioError> {
    let file = path.as_ref().display().to_string();
    let mut reader = csv::Reader::from_path(path.as_ref()).map_err(|e| LotfolioError::Import {
        file: file.clone(),
        reason: e.to_string(),
    })?;

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let import_error = |reason: String| LotfolioError::Import {
            file: file.clone(),
            reason: format!("row {}: {}", index + 1, reason),
        };

        let record = result.map_err(|e| import_error(e.to_string()))?;

        let ticker = record
            .get(0)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| import_error("missing ticker".into()))?
            .trim()
            .to_uppercase();

        let date_raw = record
            .get(1)
            .ok_or_else(|| import_error("missing date".into()))?
            .trim();
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|e| import_error(format!("invalid date '{date_raw}': {e}")))?;

        let price: f64 = record
            .get(2)
            .ok_or_else(|| import_error("missing price".into()))?
            .trim()
            .parse()
            .map_err(|e| import_error(format!("invalid price: {e}")))?;

        rows.push(PriceRow {
            ticker,
            date,
            price,
        });
    }
    Ok(rows)
}
