//! Portfolio-level aggregation over per-instrument ledgers.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::LotfolioError;
use crate::domain::ledger::{Ledger, LedgerConfig};
use crate::domain::position::Position;
use crate::ports::price_port::PricePort;

/// An ordered collection of built ledgers, optionally paired with a
/// benchmark ledger replaying the same transactions against a single symbol.
#[derive(Debug, Clone)]
pub struct Portfolio {
    ledgers: Vec<Ledger>,
    benchmark: Option<Ledger>,
}

impl Portfolio {
    pub fn new(ledgers: Vec<Ledger>) -> Self {
        Self {
            ledgers,
            benchmark: None,
        }
    }

    /// Build a portfolio with a benchmark: every position is replayed with
    /// its instrument replaced by `benchmark_symbol` (quantity, date, action
    /// and commission preserved; cost re-resolved for the benchmark).
    pub fn with_benchmark(
        ledgers: Vec<Ledger>,
        benchmark_symbol: &str,
        config: LedgerConfig,
        prices: &dyn PricePort,
    ) -> Result<Self, LotfolioError> {
        let mut shadows: Vec<Position> = Vec::new();
        for ledger in &ledgers {
            for position in ledger.positions() {
                shadows.push(Position::new(
                    position.action(),
                    position.quantity(),
                    benchmark_symbol,
                    position.date(),
                    None,
                    Some(position.commission()),
                    prices,
                )?);
            }
        }
        // The merged stream interleaves instruments, so re-establish date
        // order before replay. Per-instrument FIFO guarantees the merged
        // sequence never oversells the benchmark.
        shadows.sort_by_key(Position::date);

        log::info!(
            "building benchmark ledger for {benchmark_symbol} from {} positions",
            shadows.len()
        );
        let benchmark = Ledger::build(shadows, config, prices)?;
        Ok(Self {
            ledgers,
            benchmark: Some(benchmark),
        })
    }

    pub fn ledgers(&self) -> &[Ledger] {
        &self.ledgers
    }

    pub fn benchmark(&self) -> Option<&Ledger> {
        self.benchmark.as_ref()
    }

    /// Union date axis across all ledgers, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = BTreeSet::new();
        for ledger in &self.ledgers {
            dates.extend(ledger.dates().iter().copied());
        }
        dates.into_iter().collect()
    }

    /// Invested-weighted average of the per-instrument return series.
    /// Instruments with no value at a date drop out of both numerator and
    /// denominator; a date with no contributors has no value.
    pub fn returns(&self) -> Vec<(NaiveDate, Option<f64>)> {
        let per_ledger: Vec<(&Ledger, Vec<Option<f64>>, Vec<f64>)> = self
            .ledgers
            .iter()
            .map(|ledger| (ledger, ledger.returns(), ledger.invested()))
            .collect();

        self.dates()
            .into_iter()
            .map(|date| {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for (ledger, returns, invested) in &per_ledger {
                    let Some(index) = ledger.index_of(date) else {
                        continue;
                    };
                    let Some(r) = returns[index] else {
                        continue;
                    };
                    numerator += r * invested[index];
                    denominator += invested[index];
                }
                (date, (denominator > 0.0).then(|| numerator / denominator))
            })
            .collect()
    }

    pub fn current_returns(&self) -> Option<f64> {
        self.returns().last().and_then(|(_, r)| *r)
    }

    pub fn benchmark_returns(&self) -> Option<Vec<(NaiveDate, Option<f64>)>> {
        self.benchmark.as_ref().map(|ledger| {
            ledger
                .dates()
                .iter()
                .copied()
                .zip(ledger.returns())
                .collect()
        })
    }

    pub fn current_benchmark_returns(&self) -> Option<f64> {
        self.benchmark.as_ref().and_then(Ledger::current_returns)
    }

    /// Missing-safe sum of the per-instrument current values.
    pub fn total_value(&self) -> f64 {
        self.ledgers.iter().map(Ledger::current_value).sum()
    }

    pub fn summary(&self) -> Summary {
        let tickers = self
            .ledgers
            .iter()
            .map(|ledger| TickerSummary {
                ticker: ledger.ticker().to_string(),
                value: ledger.current_value(),
                returns: ledger.current_returns(),
                open_shares: ledger.current_open_shares(),
                closed_shares: ledger.current_closed_shares(),
                total_shares: ledger.current_total_shares(),
                average_cost_per_share: ledger.current_average_cost_per_share(),
                profit_loss: ledger.current_profit_loss(),
                unrealized_gain: ledger.current_unrealized_gain(),
            })
            .collect();

        Summary {
            tickers,
            total_value: self.total_value(),
            portfolio_returns: self.current_returns(),
            benchmark_returns: self.current_benchmark_returns(),
        }
    }
}

/// Point-in-time portfolio report, one row per instrument.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub tickers: Vec<TickerSummary>,
    pub total_value: f64,
    pub portfolio_returns: Option<f64>,
    pub benchmark_returns: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub value: f64,
    pub returns: Option<f64>,
    pub open_shares: f64,
    pub closed_shares: f64,
    pub total_shares: f64,
    pub average_cost_per_share: Option<f64>,
    pub profit_loss: f64,
    pub unrealized_gain: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::WeekendFilter;
    use crate::domain::position::Action;
    use crate::domain::series::PriceSeries;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use std::collections::BTreeMap;

    // 2022-04-11 is a Monday.
    fn a_monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 4, 11).unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        a_monday() + Duration::days(offset)
    }

    struct FlatPrices {
        per_ticker: BTreeMap<String, f64>,
    }

    impl FlatPrices {
        fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                per_ticker: pairs
                    .iter()
                    .map(|(t, p)| (t.to_string(), *p))
                    .collect(),
            }
        }
    }

    impl PricePort for FlatPrices {
        fn exists(&self, ticker: &str) -> Result<bool, LotfolioError> {
            Ok(self.per_ticker.contains_key(ticker))
        }

        fn read(&self, ticker: &str, dates: &[NaiveDate]) -> Result<PriceSeries, LotfolioError> {
            let price = self.per_ticker.get(ticker).copied();
            PriceSeries::from_points(ticker, dates.iter().filter_map(|d| price.map(|p| (*d, p))))
        }
    }

    fn config(today: NaiveDate) -> LedgerConfig {
        LedgerConfig {
            today,
            weekends: WeekendFilter::Keep,
        }
    }

    fn buy(ticker: &str, quantity: f64, cost: f64, date: NaiveDate, port: &dyn PricePort) -> Position {
        Position::new(Action::Buy, quantity, ticker, date, Some(cost), None, port).unwrap()
    }

    fn single_buy_ledger(
        ticker: &str,
        quantity: f64,
        cost: f64,
        value: f64,
        today: NaiveDate,
    ) -> Ledger {
        let port = FlatPrices::new(&[(ticker, value)]);
        let position = buy(ticker, quantity, cost, a_monday(), &port);
        Ledger::build(vec![position], config(today), &port).unwrap()
    }

    #[test]
    fn balanced_two_instrument_returns() {
        // Equal investments: portfolio return equals both instruments'
        // return.
        let fb = single_buy_ledger("FB", 1.0, 100.0, 200.0, a_monday());
        let goog = single_buy_ledger("GOOG", 1.0, 100.0, 200.0, a_monday());
        let portfolio = Portfolio::new(vec![fb, goog]);

        assert_relative_eq!(portfolio.current_returns().unwrap(), 100.0);
    }

    #[test]
    fn unbalanced_weights_follow_invested_amounts() {
        // 1 @ 100 returning 100% and 10 @ 50 returning 300%: the average is
        // weighted by the invested amounts.
        let fb = single_buy_ledger("FB", 1.0, 100.0, 200.0, a_monday());
        let goog = single_buy_ledger("GOOG", 10.0, 50.0, 200.0, a_monday());
        let portfolio = Portfolio::new(vec![fb, goog]);

        let r1 = 100.0 * (200.0 - 100.0) / 100.0;
        let r2 = 100.0 * (200.0 - 50.0) / 50.0;
        let expected = (r1 * 100.0 + r2 * 500.0) / 600.0;
        assert_relative_eq!(portfolio.current_returns().unwrap(), expected);
    }

    #[test]
    fn weighted_average_matches_snapshot_identity() {
        let fb = single_buy_ledger("FB", 2.0, 80.0, 100.0, day(1));
        let goog = single_buy_ledger("GOOG", 3.0, 120.0, 90.0, day(1));
        let portfolio = Portfolio::new(vec![fb, goog]);

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for ledger in portfolio.ledgers() {
            numerator += ledger.current_returns().unwrap() * ledger.current_invested();
            denominator += ledger.current_invested();
        }
        assert_relative_eq!(
            portfolio.current_returns().unwrap(),
            numerator / denominator,
            epsilon = 1e-9
        );
    }

    #[test]
    fn instruments_without_data_are_excluded_per_date() {
        // GOOG enters a day later; Monday's portfolio return must be FB's
        // alone.
        let port = FlatPrices::new(&[("FB", 110.0), ("GOOG", 100.0)]);
        let fb = Ledger::build(
            vec![buy("FB", 1.0, 100.0, a_monday(), &port)],
            config(day(1)),
            &port,
        )
        .unwrap();
        let goog = Ledger::build(
            vec![buy("GOOG", 1.0, 100.0, day(1), &port)],
            config(day(1)),
            &port,
        )
        .unwrap();
        let portfolio = Portfolio::new(vec![fb, goog]);

        let returns = portfolio.returns();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0].1.unwrap(), 10.0);
        // Tuesday: FB at 10%, GOOG at 0%, equally invested.
        assert_relative_eq!(returns[1].1.unwrap(), 5.0);
    }

    #[test]
    fn empty_portfolio_has_no_returns() {
        let portfolio = Portfolio::new(vec![]);
        assert!(portfolio.dates().is_empty());
        assert_eq!(portfolio.current_returns(), None);
        assert_relative_eq!(portfolio.total_value(), 0.0);
    }

    #[test]
    fn total_value_sums_instruments() {
        let fb = single_buy_ledger("FB", 2.0, 100.0, 110.0, a_monday());
        let goog = single_buy_ledger("GOOG", 1.0, 50.0, 60.0, a_monday());
        let portfolio = Portfolio::new(vec![fb, goog]);
        assert_relative_eq!(portfolio.total_value(), 220.0 + 60.0);
    }

    #[test]
    fn summary_per_instrument_fields() {
        let fb = single_buy_ledger("FB", 2.0, 100.0, 110.0, day(1));
        let portfolio = Portfolio::new(vec![fb]);
        let summary = portfolio.summary();

        assert_eq!(summary.tickers.len(), 1);
        let row = &summary.tickers[0];
        assert_eq!(row.ticker, "FB");
        assert_relative_eq!(row.value, 220.0);
        assert_relative_eq!(row.returns.unwrap(), 10.0);
        assert_relative_eq!(row.open_shares, 2.0);
        assert_relative_eq!(row.closed_shares, 0.0);
        assert_relative_eq!(row.total_shares, 2.0);
        assert_relative_eq!(row.average_cost_per_share.unwrap(), 100.0);
        assert_relative_eq!(row.profit_loss, 0.0);
        assert_relative_eq!(row.unrealized_gain, 20.0);
        assert!(summary.benchmark_returns.is_none());
        assert_relative_eq!(summary.total_value, 220.0);
    }

    #[test]
    fn benchmark_against_own_symbol_reproduces_returns() {
        // A single-instrument portfolio benchmarked against that same symbol
        // must match its own return series.
        let port = FlatPrices::new(&[("FB", 150.0)]);
        let positions = vec![
            buy("FB", 2.0, 150.0, a_monday(), &port),
            buy("FB", 1.0, 150.0, day(1), &port),
        ];
        let ledger = Ledger::build(positions, config(day(2)), &port).unwrap();
        let portfolio =
            Portfolio::with_benchmark(vec![ledger], "FB", config(day(2)), &port).unwrap();

        let own: Vec<_> = portfolio.returns();
        let bench = portfolio.benchmark_returns().unwrap();
        assert_eq!(own.len(), bench.len());
        for ((d1, r1), (d2, r2)) in own.iter().zip(&bench) {
            assert_eq!(d1, d2);
            match (r1, r2) {
                (Some(a), Some(b)) => assert_relative_eq!(*a, *b, epsilon = 1e-9),
                (a, b) => assert_eq!(a, b),
            }
        }
        assert_eq!(
            portfolio.current_returns(),
            portfolio.current_benchmark_returns()
        );
    }

    #[test]
    fn benchmark_preserves_quantity_date_commission() {
        let port = FlatPrices::new(&[("FB", 100.0), ("SPY", 40.0)]);
        let position = Position::new(
            Action::Buy,
            3.0,
            "FB",
            a_monday(),
            Some(100.0),
            Some(1.5),
            &port,
        )
        .unwrap();
        let ledger = Ledger::build(vec![position], config(a_monday()), &port).unwrap();
        let portfolio =
            Portfolio::with_benchmark(vec![ledger], "SPY", config(a_monday()), &port).unwrap();

        let bench = portfolio.benchmark().unwrap();
        assert_eq!(bench.ticker(), "SPY");
        let shadow = &bench.positions()[0];
        assert_relative_eq!(shadow.quantity(), 3.0);
        assert_eq!(shadow.date(), a_monday());
        assert_relative_eq!(shadow.commission(), 1.5);
        // Cost is the benchmark's own quote, not the original instrument's.
        assert_relative_eq!(shadow.cost(), 40.0);
    }
}
