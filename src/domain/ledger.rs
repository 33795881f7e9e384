//! Per-instrument lot accounting.
//!
//! A [`Ledger`] replays one instrument's position history over a daily date
//! axis. Each buy opens a [`Lot`] — a column of per-date quantity, cost basis,
//! market value and realized profit — and each sell consumes the oldest open
//! lots first. Cells before a lot exists, or after it is fully closed, hold
//! `None` ("not applicable") and are excluded from every aggregate.

use chrono::NaiveDate;

use crate::domain::calendar::{TradingCalendar, WeekendFilter};
use crate::domain::error::LotfolioError;
use crate::domain::position::{Action, Position};
use crate::domain::series::PriceSeries;
use crate::ports::price_port::PricePort;

/// Share amounts closer than this are considered equal.
const QUANTITY_EPSILON: f64 = 1e-10;

/// Calendar configuration for ledger construction. The weekend filter is
/// required: callers state explicitly whether weekend days are on the axis.
#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    pub today: NaiveDate,
    pub weekends: WeekendFilter,
}

/// The still-open remainder of a single buy, as columns over the date axis.
#[derive(Debug, Clone)]
pub struct Lot {
    pub opened: NaiveDate,
    pub quantity: Vec<Option<f64>>,
    pub investment: Vec<Option<f64>>,
    pub value: Vec<Option<f64>>,
    pub profit_loss: Vec<Option<f64>>,
}

impl Lot {
    fn not_applicable(opened: NaiveDate, len: usize) -> Self {
        Self {
            opened,
            quantity: vec![None; len],
            investment: vec![None; len],
            value: vec![None; len],
            profit_loss: vec![None; len],
        }
    }
}

/// Lot-accounting state for one instrument, built once from its full
/// position history and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Ledger {
    ticker: String,
    dates: Vec<NaiveDate>,
    market: Vec<Option<f64>>,
    lots: Vec<Lot>,
    shares_bought: Vec<f64>,
    shares_sold: Vec<f64>,
    positions: Vec<Position>,
}

impl Ledger {
    /// Build a ledger, fetching the instrument's market series from `prices`.
    pub fn build(
        positions: Vec<Position>,
        config: LedgerConfig,
        prices: &dyn PricePort,
    ) -> Result<Self, LotfolioError> {
        let ticker = validate_positions(&positions)?;
        let dates = date_axis(&positions, &config)?;
        let series = prices.read(&ticker, &dates)?;
        Self::from_series(positions, config, series)
    }

    /// Build a ledger from an already-fetched (or synthetic) price series.
    pub fn from_series(
        positions: Vec<Position>,
        config: LedgerConfig,
        series: PriceSeries,
    ) -> Result<Self, LotfolioError> {
        let ticker = validate_positions(&positions)?;
        let dates = date_axis(&positions, &config)?;

        let market = series.align(&dates);
        if market.iter().all(Option::is_none) {
            return Err(LotfolioError::PriceSeriesInvalid {
                ticker,
                reason: "series has no value on any calendar date".into(),
            });
        }

        let n = dates.len();
        let mut ledger = Self {
            ticker,
            dates,
            market,
            lots: Vec::new(),
            shares_bought: vec![0.0; n],
            shares_sold: vec![0.0; n],
            positions: Vec::new(),
        };

        for position in positions {
            let index = ledger.index_of(position.date()).ok_or_else(|| {
                LotfolioError::DateOutOfRange {
                    ticker: ledger.ticker.clone(),
                    date: position.date(),
                }
            })?;
            match position.action() {
                Action::Buy => ledger.add_lot(&position, index),
                Action::Sell => ledger.close_position(&position, index)?,
            }
            ledger.positions.push(position);
        }

        log::debug!(
            "built ledger for {}: {} lots over {} dates",
            ledger.ticker,
            ledger.lots.len(),
            ledger.dates.len()
        );
        Ok(ledger)
    }

    /// Open a new lot at `index` (the axis position of the buy date).
    fn add_lot(&mut self, position: &Position, index: usize) {
        let n = self.dates.len();
        let mut lot = Lot::not_applicable(position.date(), n);
        for i in index..n {
            lot.quantity[i] = Some(position.quantity());
            lot.investment[i] = Some(position.cost());
            lot.value[i] = self.market[i];
            lot.profit_loss[i] = Some(0.0);
        }
        for i in index..n {
            self.shares_bought[i] += position.quantity();
        }
        self.lots.push(lot);
    }

    /// Consume open lots oldest-first. The loop terminates because `pending`
    /// strictly decreases on every consuming iteration and the lot list is
    /// finite.
    fn close_position(&mut self, position: &Position, index: usize) -> Result<(), LotfolioError> {
        let n = self.dates.len();
        let open: f64 = self
            .lots
            .iter()
            .filter_map(|lot| lot.quantity[index])
            .sum();
        if position.quantity() > open + QUANTITY_EPSILON {
            return Err(LotfolioError::InsufficientShares {
                ticker: self.ticker.clone(),
                date: position.date(),
                requested: position.quantity(),
                open,
            });
        }

        let mut pending = position.quantity();
        for lot in &mut self.lots {
            if pending <= QUANTITY_EPSILON {
                break;
            }
            let available = match lot.quantity[index] {
                Some(q) if q > QUANTITY_EPSILON => q,
                _ => continue,
            };
            let consumed = available.min(pending);
            pending -= consumed;

            // Realized gain is priced at the sell date. A market gap there
            // poisons the lot's realized-profit column, mirroring the missing
            // quote instead of inventing one.
            let realized = match (lot.value[index], lot.investment[index]) {
                (Some(value), Some(investment)) => Some(consumed * (value - investment)),
                _ => None,
            };

            let remaining = available - consumed;
            let closes_lot = remaining <= QUANTITY_EPSILON;
            for i in index..n {
                if lot.quantity[i].is_some() {
                    lot.quantity[i] = Some(if closes_lot { 0.0 } else { remaining });
                }
                if closes_lot {
                    lot.investment[i] = None;
                    lot.value[i] = None;
                }
                lot.profit_loss[i] = match (lot.profit_loss[i], realized) {
                    (Some(p), Some(r)) => Some(p + r),
                    _ => None,
                };
            }
        }

        for i in index..n {
            self.shares_sold[i] += position.quantity();
        }
        Ok(())
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// The instrument's market price per share, aligned to the axis.
    pub fn market(&self) -> &[Option<f64>] {
        &self.market
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Cost basis of the open holding: Σ investment × quantity across lots.
    pub fn invested(&self) -> Vec<f64> {
        self.sum_over_lots(|lot, i| match (lot.investment[i], lot.quantity[i]) {
            (Some(c), Some(q)) => Some(c * q),
            _ => None,
        })
    }

    /// Market value of the open holding: Σ value × quantity across lots.
    pub fn value(&self) -> Vec<f64> {
        self.sum_over_lots(|lot, i| match (lot.value[i], lot.quantity[i]) {
            (Some(v), Some(q)) => Some(v * q),
            _ => None,
        })
    }

    /// Realized profit accumulated by closes.
    pub fn profit_loss(&self) -> Vec<f64> {
        self.sum_over_lots(|lot, i| lot.profit_loss[i])
    }

    /// Σ quantity × (value − investment) across open lots.
    pub fn unrealized_gain(&self) -> Vec<f64> {
        self.sum_over_lots(|lot, i| {
            match (lot.quantity[i], lot.value[i], lot.investment[i]) {
                (Some(q), Some(v), Some(c)) => Some(q * (v - c)),
                _ => None,
            }
        })
    }

    /// Percentage return on the invested amount; `None` where nothing is
    /// invested.
    pub fn returns(&self) -> Vec<Option<f64>> {
        self.invested()
            .iter()
            .zip(self.unrealized_gain())
            .map(|(&invested, gain)| {
                if invested.abs() > QUANTITY_EPSILON {
                    Some(100.0 * gain / invested)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Shares currently open: cumulative bought minus cumulative sold.
    pub fn open_shares(&self) -> Vec<f64> {
        self.shares_bought
            .iter()
            .zip(&self.shares_sold)
            .map(|(b, s)| b - s)
            .collect()
    }

    pub fn average_cost_per_share(&self) -> Vec<Option<f64>> {
        self.invested()
            .iter()
            .zip(self.open_shares())
            .map(|(&invested, open)| {
                if open.abs() > QUANTITY_EPSILON {
                    Some(invested / open)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn invested_at(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|i| self.invested()[i])
    }

    pub fn returns_at(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).and_then(|i| self.returns()[i])
    }

    pub fn current_invested(&self) -> f64 {
        last(&self.invested())
    }

    pub fn current_value(&self) -> f64 {
        last(&self.value())
    }

    pub fn current_profit_loss(&self) -> f64 {
        last(&self.profit_loss())
    }

    pub fn current_unrealized_gain(&self) -> f64 {
        last(&self.unrealized_gain())
    }

    pub fn current_returns(&self) -> Option<f64> {
        self.returns().last().copied().flatten()
    }

    pub fn current_open_shares(&self) -> f64 {
        last(&self.open_shares())
    }

    /// Shares ever bought.
    pub fn current_total_shares(&self) -> f64 {
        last(&self.shares_bought)
    }

    /// Shares ever sold.
    pub fn current_closed_shares(&self) -> f64 {
        last(&self.shares_sold)
    }

    pub fn current_average_cost_per_share(&self) -> Option<f64> {
        self.average_cost_per_share().last().copied().flatten()
    }

    /// The instrument's market price today, if quoted.
    pub fn current_market(&self) -> Option<f64> {
        self.market.last().copied().flatten()
    }

    fn sum_over_lots<F>(&self, cell: F) -> Vec<f64>
    where
        F: Fn(&Lot, usize) -> Option<f64>,
    {
        (0..self.dates.len())
            .map(|i| self.lots.iter().filter_map(|lot| cell(lot, i)).sum())
            .collect()
    }
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

/// Non-empty, one instrument, non-decreasing dates. Returns the ticker.
fn validate_positions(positions: &[Position]) -> Result<String, LotfolioError> {
    let first = positions.first().ok_or(LotfolioError::EmptyInput)?;
    let ticker = first.ticker().to_string();

    for position in positions {
        if position.ticker() != ticker {
            return Err(LotfolioError::InconsistentInstrument {
                expected: ticker,
                found: position.ticker().to_string(),
            });
        }
    }
    for pair in positions.windows(2) {
        if pair[1].date() < pair[0].date() {
            return Err(LotfolioError::UnsortedPositions {
                ticker,
                date: pair[1].date(),
            });
        }
    }
    Ok(ticker)
}

fn date_axis(
    positions: &[Position],
    config: &LedgerConfig,
) -> Result<Vec<NaiveDate>, LotfolioError> {
    let first = positions.first().ok_or(LotfolioError::EmptyInput)?;
    let dates = TradingCalendar::new(first.date(), config.today, config.weekends).days();
    if dates.is_empty() {
        return Err(LotfolioError::DateOutOfRange {
            ticker: first.ticker().to_string(),
            date: first.date(),
        });
    }
    Ok(dates)
}
