//! A single validated buy or sell transaction.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::domain::calendar::is_weekend;
use crate::domain::error::LotfolioError;
use crate::ports::price_port::PricePort;

/// How far around the transaction date to look for a price when the exact
/// date has none (market holidays).
const PRICE_SEARCH_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "bought" => Ok(Action::Buy),
            "sell" | "sold" => Ok(Action::Sell),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Sell => write!(f, "sell"),
        }
    }
}

/// One transaction for one instrument. All validation happens in [`Position::new`];
/// a constructed value is immutable and known-good.
#[derive(Debug, Clone)]
pub struct Position {
    action: Action,
    quantity: f64,
    ticker: String,
    date: NaiveDate,
    cost: f64,
    commission: f64,
}

impl Position {
    /// Validates and builds a position. When `cost` is absent it is resolved
    /// from `prices` at `date`, then at neighboring days ordered by absolute
    /// distance (earlier day first on ties).
    pub fn new(
        action: Action,
        quantity: f64,
        ticker: &str,
        date: NaiveDate,
        cost: Option<f64>,
        commission: Option<f64>,
        prices: &dyn PricePort,
    ) -> Result<Self, LotfolioError> {
        log::debug!(
            "creating position: {action} {quantity} {ticker} at {date} (cost: {cost:?}, commission: {commission:?})"
        );

        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(LotfolioError::InvalidQuantity {
                ticker: ticker.to_string(),
                date,
                quantity,
            });
        }

        if !prices.exists(ticker)? {
            return Err(LotfolioError::InvalidTicker {
                ticker: ticker.to_string(),
            });
        }

        if is_weekend(date) {
            return Err(LotfolioError::InvalidDate {
                ticker: ticker.to_string(),
                date,
            });
        }

        let cost = match cost {
            Some(c) => c,
            None => resolve_cost(ticker, date, prices)?,
        };

        Ok(Self {
            action,
            quantity,
            ticker: ticker.to_string(),
            date,
            cost,
            commission: commission.unwrap_or(0.0),
        })
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:5} {} for {:5.2}$ ({:5.2}$) at {}",
            self.action, self.quantity, self.ticker, self.cost, self.commission, self.date
        )
    }
}

/// Price at `date`, falling back to the nearest surrounding days.
fn resolve_cost(
    ticker: &str,
    date: NaiveDate,
    prices: &dyn PricePort,
) -> Result<f64, LotfolioError> {
    let series = prices.read(ticker, &[date])?;
    if let Some(price) = series.get(date) {
        return Ok(price);
    }

    log::info!("no price for {ticker} at {date}, searching nearby days");
    for distance in 1..=PRICE_SEARCH_WINDOW_DAYS {
        for offset in [-distance, distance] {
            let candidate = date + Duration::days(offset);
            let series = prices.read(ticker, &[candidate])?;
            if let Some(price) = series.get(candidate) {
                return Ok(price);
            }
        }
    }

    Err(LotfolioError::PriceNotFound {
        ticker: ticker.to_string(),
        date,
    })
}
