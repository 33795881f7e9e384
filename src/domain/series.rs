//! Date-indexed price series returned by price sources.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::error::LotfolioError;

/// A price series keyed by date. Missing dates are simply absent; a NaN
/// input value is treated as a gap rather than stored.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Build a series from (date, price) points, rejecting duplicate dates.
    pub fn from_points<I>(ticker: &str, points: I) -> Result<Self, LotfolioError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut map = BTreeMap::new();
        for (date, price) in points {
            if price.is_nan() {
                continue;
            }
            if map.insert(date, price).is_some() {
                return Err(LotfolioError::PriceSeriesInvalid {
                    ticker: ticker.to_string(),
                    reason: format!("duplicate date {date}"),
                });
            }
        }
        Ok(Self { points: map })
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// One entry per axis date, `None` where the series has a gap.
    pub fn align(&self, dates: &[NaiveDate]) -> Vec<Option<f64>> {
        dates.iter().map(|d| self.get(*d)).collect()
    }
}
