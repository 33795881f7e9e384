#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use lotfolio::domain::calendar::WeekendFilter;
use lotfolio::domain::error::LotfolioError;
use lotfolio::domain::ledger::LedgerConfig;
use lotfolio::domain::position::{Action, Position};
use lotfolio::domain::series::PriceSeries;
use lotfolio::ports::price_port::PricePort;

/// Price port over fixed in-memory quotes, one map per ticker.
pub struct MockPricePort {
    pub quotes: HashMap<String, HashMap<NaiveDate, f64>>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            quotes: HashMap::new(),
        }
    }

    pub fn with_quotes(mut self, ticker: &str, quotes: Vec<(NaiveDate, f64)>) -> Self {
        self.quotes
            .insert(ticker.to_string(), quotes.into_iter().collect());
        self
    }

    /// The same price on every day of `days`.
    pub fn with_flat(self, ticker: &str, days: &[NaiveDate], price: f64) -> Self {
        self.with_quotes(ticker, days.iter().map(|d| (*d, price)).collect())
    }
}

impl PricePort for MockPricePort {
    fn exists(&self, ticker: &str) -> Result<bool, LotfolioError> {
        Ok(self.quotes.contains_key(ticker))
    }

    fn read(&self, ticker: &str, dates: &[NaiveDate]) -> Result<PriceSeries, LotfolioError> {
        let quotes = self.quotes.get(ticker);
        PriceSeries::from_points(
            ticker,
            dates
                .iter()
                .filter_map(|d| quotes.and_then(|q| q.get(d)).map(|p| (*d, *p))),
        )
    }
}

/// 2022-04-11, a Monday; day(0) through day(4) are weekdays.
pub fn a_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 4, 11).unwrap()
}

pub fn day(offset: i64) -> NaiveDate {
    a_monday() + Duration::days(offset)
}

pub fn weekdays(count: i64) -> Vec<NaiveDate> {
    (0..count).map(day).collect()
}

pub fn config(today: NaiveDate) -> LedgerConfig {
    LedgerConfig {
        today,
        weekends: WeekendFilter::Keep,
    }
}

pub fn buy(
    ticker: &str,
    quantity: f64,
    cost: f64,
    date: NaiveDate,
    port: &dyn PricePort,
) -> Position {
    Position::new(Action::Buy, quantity, ticker, date, Some(cost), None, port).unwrap()
}

pub fn sell(ticker: &str, quantity: f64, date: NaiveDate, port: &dyn PricePort) -> Position {
    Position::new(Action::Sell, quantity, ticker, date, None, None, port).unwrap()
}
