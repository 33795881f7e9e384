//! SQLite price store adapter.
//!
//! Backs [`PricePort`] with a local `prices` table filled by the
//! `import-prices` command. One row per (ticker, date); dates are stored as
//! ISO text.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::adapters::price_csv::PriceRow;
use crate::domain::error::LotfolioError;
use crate::domain::series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

pub struct SqlitePriceAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlitePriceAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LotfolioError> {
        let db_path =
            config
                .get_string("prices", "path")
                .ok_or_else(|| LotfolioError::ConfigMissing {
                    section: "prices".into(),
                    key: "path".into(),
                })?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .build(manager)
            .map_err(|e: r2d2::Error| LotfolioError::Store {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, LotfolioError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| LotfolioError::Store {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn initialize_schema(&self) -> Result<(), LotfolioError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prices (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                price REAL NOT NULL,
                PRIMARY KEY (ticker, date)
            );
            CREATE INDEX IF NOT EXISTS idx_prices_ticker ON prices(ticker);",
        )
        .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_prices(&self, rows: &[PriceRow]) -> Result<(), LotfolioError> {
        let mut conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO prices (ticker, date, price) VALUES (?1, ?2, ?3)",
                params![
                    row.ticker,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.price
                ],
            )
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    pub fn tickers(&self) -> Result<Vec<String>, LotfolioError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT ticker FROM prices ORDER BY ticker")
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(
                row.map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                    reason: e.to_string(),
                })?,
            );
        }
        Ok(tickers)
    }

    /// First/last quote date and quote count for a ticker.
    pub fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LotfolioError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM prices WHERE ticker = ?1",
                params![ticker],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_stored_date(&min_str)?;
                let max = parse_stored_date(&max_str)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

fn parse_stored_date(raw: &str) -> Result<NaiveDate, LotfolioError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| LotfolioError::Store {
        reason: format!("malformed date '{raw}' in price store: {e}"),
    })
}

impl PricePort for SqlitePriceAdapter {
    fn exists(&self, ticker: &str) -> Result<bool, LotfolioError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM prices WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;
        Ok(count > 0)
    }

    fn read(&self, ticker: &str, dates: &[NaiveDate]) -> Result<PriceSeries, LotfolioError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| LotfolioError::Store {
            reason: e.to_string(),
        })?;

        let (Some(start), Some(end)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(PriceSeries::default());
        };

        let mut stmt = conn
            .prepare(
                "SELECT date, price FROM prices
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map(
                params![
                    ticker,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    let date_str: String = row.get(0)?;
                    let price: f64 = row.get(1)?;
                    Ok((date_str, price))
                },
            )
            .map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            let (date_str, price) =
                row.map_err(|e: rusqlite::Error| LotfolioError::StoreQuery {
                    reason: e.to_string(),
                })?;
            points.push((parse_stored_date(&date_str)?, price));
        }

        // The range query may return dates between the requested ones; keep
        // only what was asked for.
        let wanted: std::collections::BTreeSet<NaiveDate> = dates.iter().copied().collect();
        PriceSeries::from_points(
            ticker,
            points.into_iter().filter(|(d, _)| wanted.contains(d)),
        )
    }
}
