//! Transaction-export import adapter.
//!
//! Parses portfolio CSV exports (e.g. broker or Yahoo Finance exports) into
//! a normalized transaction table. Exports disagree on column names and
//! action spellings, so headers are matched against known aliases and
//! actions against `buy`/`bought`/`sell`/`sold` in any case. Sell rows with
//! a negative quantity are normalized to a positive quantity.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::domain::error::LotfolioError;
use crate::domain::position::{Action, Position};
use crate::ports::price_port::PricePort;

/// One normalized row of a transaction export.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub action: Action,
    pub quantity: f64,
    pub ticker: String,
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub commission: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Action,
    Quantity,
    Ticker,
    Date,
    Price,
    Commission,
}

fn map_column(header: &str) -> Option<Column> {
    match header.trim().to_lowercase().as_str() {
        "action" | "type" => Some(Column::Action),
        "quantity" | "amount" => Some(Column::Quantity),
        "ticker" | "symbol" => Some(Column::Ticker),
        "date" | "trade date" | "purchase date" => Some(Column::Date),
        "price" | "purchase price" | "cost" => Some(Column::Price),
        "commission" | "fee" => Some(Column::Commission),
        _ => None,
    }
}

/// Dates arrive either as epoch seconds or as ISO / slashed calendar dates.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(epoch) = raw.parse::<i64>() {
        return DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionRecord>, LotfolioError> {
    let file = path.as_ref().display().to_string();
    let mut reader = csv::Reader::from_path(path.as_ref()).map_err(|e| LotfolioError::Import {
        file: file.clone(),
        reason: e.to_string(),
    })?;

    let headers = reader.headers().map_err(|e| LotfolioError::Import {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    let columns: Vec<Option<Column>> = headers.iter().map(map_column).collect();
    log::debug!("mapped columns of {file}: {columns:?}");

    for required in [Column::Action, Column::Quantity, Column::Ticker, Column::Date] {
        if !columns.contains(&Some(required)) {
            return Err(LotfolioError::Import {
                file,
                reason: format!("no column maps to {required:?}"),
            });
        }
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LotfolioError::Import {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        records.push(parse_record(&file, row, &columns, &record)?);
    }
    Ok(records)
}

/// First non-empty cell of the requested column.
fn field<'a>(
    columns: &[Option<Column>],
    record: &'a csv::StringRecord,
    wanted: Column,
) -> Option<&'a str> {
    columns
        .iter()
        .zip(record.iter())
        .find(|(c, v)| **c == Some(wanted) && !v.trim().is_empty())
        .map(|(_, v)| v.trim())
}

fn parse_record(
    file: &str,
    row: usize,
    columns: &[Option<Column>],
    record: &csv::StringRecord,
) -> Result<TransactionRecord, LotfolioError> {
    let import_error = |reason: String| LotfolioError::Import {
        file: file.to_string(),
        reason: format!("row {}: {}", row + 1, reason),
    };

    let field = |wanted: Column| field(columns, record, wanted);

    let action: Action = field(Column::Action)
        .ok_or_else(|| import_error("missing action".into()))?
        .parse()
        .map_err(import_error)?;

    let mut quantity: f64 = field(Column::Quantity)
        .ok_or_else(|| import_error("missing quantity".into()))?
        .parse()
        .map_err(|e| import_error(format!("invalid quantity: {e}")))?;
    // Some exports encode sells with a negative quantity; the sign belongs
    // to the action.
    if quantity < 0.0 {
        if action != Action::Sell {
            return Err(import_error(format!(
                "negative quantity {quantity} on a {action} row"
            )));
        }
        quantity = quantity.abs();
    }

    let ticker = field(Column::Ticker)
        .ok_or_else(|| import_error("missing ticker".into()))?
        .to_uppercase();

    let date_raw = field(Column::Date).ok_or_else(|| import_error("missing date".into()))?;
    let date =
        parse_date(date_raw).ok_or_else(|| import_error(format!("invalid date '{date_raw}'")))?;

    let price = match field(Column::Price) {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|e| import_error(format!("invalid price: {e}")))?,
        ),
        None => None,
    };
    let commission = match field(Column::Commission) {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|e| import_error(format!("invalid commission: {e}")))?,
        ),
        None => None,
    };

    Ok(TransactionRecord {
        action,
        quantity,
        ticker,
        date,
        price,
        commission,
    })
}

/// Validated positions grouped per ticker, each group in date order.
/// The map is ordered so downstream output is deterministic.
pub fn grouped_positions(
    records: &[TransactionRecord],
    default_commission: f64,
    prices: &dyn PricePort,
) -> Result<BTreeMap<String, Vec<Position>>, LotfolioError> {
    let mut grouped: BTreeMap<String, Vec<TransactionRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.ticker.clone())
            .or_default()
            .push(record.clone());
    }

    let mut positions = BTreeMap::new();
    for (ticker, mut group) in grouped {
        group.sort_by_key(|r| r.date);
        let mut built = Vec::with_capacity(group.len());
        for record in group {
            built.push(Position::new(
                record.action,
                record.quantity,
                &record.ticker,
                record.date,
                record.price,
                record.commission.or(Some(default_commission)),
                prices,
            )?);
        }
        positions.insert(ticker, built);
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::PriceSeries;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct AnyPrices;

    impl PricePort for AnyPrices {
        fn exists(&self, _ticker: &str) -> Result<bool, LotfolioError> {
            Ok(true)
        }

        fn read(&self, ticker: &str, dates: &[NaiveDate]) -> Result<PriceSeries, LotfolioError> {
            PriceSeries::from_points(ticker, dates.iter().map(|d| (*d, 100.0)))
        }
    }

    #[test]
    fn parses_canonical_columns() {
        let file = write_csv(
            "action,quantity,ticker,date,price,commission\n\
             buy,10,FB,2022-04-11,100.5,1.0\n\
             sell,5,FB,2022-04-13,,\n",
        );
        let records = parse_file(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, Action::Buy);
        assert_eq!(records[0].quantity, 10.0);
        assert_eq!(records[0].ticker, "FB");
        assert_eq!(records[0].date, date(2022, 4, 11));
        assert_eq!(records[0].price, Some(100.5));
        assert_eq!(records[0].commission, Some(1.0));
        assert_eq!(records[1].action, Action::Sell);
        assert_eq!(records[1].price, None);
    }

    #[test]
    fn maps_export_column_aliases() {
        let file = write_csv(
            "Type,Amount,Symbol,Trade Date,Purchase Price\n\
             BUY,2,goog,2022/04/11,99.0\n",
        );
        let records = parse_file(file.path()).unwrap();

        assert_eq!(records[0].action, Action::Buy);
        assert_eq!(records[0].ticker, "GOOG");
        assert_eq!(records[0].date, date(2022, 4, 11));
        assert_eq!(records[0].price, Some(99.0));
    }

    #[test]
    fn accepts_epoch_second_dates() {
        // 1649635200 is 2022-04-11 (a Monday) at midnight UTC.
        let file = write_csv("action,quantity,ticker,date\nbuy,1,FB,1649635200\n");
        let records = parse_file(file.path()).unwrap();
        assert_eq!(records[0].date, date(2022, 4, 11));
    }

    #[test]
    fn accepts_capitalized_sold_action() {
        let file = write_csv("action,quantity,ticker,date\nSOLD,-3,FB,2022-04-11\n");
        let records = parse_file(file.path()).unwrap();
        assert_eq!(records[0].action, Action::Sell);
        assert_eq!(records[0].quantity, 3.0);
    }

    #[test]
    fn negative_buy_quantity_is_an_error() {
        let file = write_csv("action,quantity,ticker,date\nbuy,-3,FB,2022-04-11\n");
        let result = parse_file(file.path());
        assert!(matches!(result, Err(LotfolioError::Import { .. })));
    }

    #[test]
    fn missing_action_is_an_error() {
        let file = write_csv("action,quantity,ticker,date\n,3,FB,2022-04-11\n");
        let result = parse_file(file.path());
        assert!(matches!(
            result,
            Err(LotfolioError::Import { reason, .. }) if reason.contains("missing action")
        ));
    }

    #[test]
    fn unmapped_required_column_is_an_error() {
        let file = write_csv("action,quantity,note,date\nbuy,3,hello,2022-04-11\n");
        let result = parse_file(file.path());
        assert!(matches!(
            result,
            Err(LotfolioError::Import { reason, .. }) if reason.contains("Ticker")
        ));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let file = write_csv(
            "action,quantity,ticker,date,comment\nbuy,1,FB,2022-04-11,great stock\n",
        );
        let records = parse_file(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn grouping_splits_by_ticker_and_sorts_by_date() {
        let file = write_csv(
            "action,quantity,ticker,date\n\
             buy,1,GOOG,2022-04-12\n\
             buy,2,FB,2022-04-12\n\
             buy,1,FB,2022-04-11\n",
        );
        let records = parse_file(file.path()).unwrap();
        let grouped = grouped_positions(&records, 0.0, &AnyPrices).unwrap();

        assert_eq!(grouped.len(), 2);
        let fb = &grouped["FB"];
        assert_eq!(fb.len(), 2);
        assert_eq!(fb[0].date(), date(2022, 4, 11));
        assert_eq!(fb[1].date(), date(2022, 4, 12));
        assert_eq!(grouped["GOOG"].len(), 1);
    }

    #[test]
    fn default_commission_applies_when_absent() {
        let file = write_csv(
            "action,quantity,ticker,date,commission\n\
             buy,1,FB,2022-04-11,\n\
             buy,1,FB,2022-04-12,2.5\n",
        );
        let records = parse_file(file.path()).unwrap();
        let grouped = grouped_positions(&records, 1.0, &AnyPrices).unwrap();
        let fb = &grouped["FB"];
        assert_eq!(fb[0].commission(), 1.0);
        assert_eq!(fb[1].commission(), 2.5);
    }
}
