//! Price source access port trait.

use chrono::NaiveDate;

use crate::domain::error::LotfolioError;
use crate::domain::series::PriceSeries;

/// A source of historical per-share prices. Implementations own their retry,
/// caching and connection concerns; the domain treats calls as plain blocking
/// lookups.
pub trait PricePort {
    /// Whether `ticker` is known to this source at all.
    fn exists(&self, ticker: &str) -> Result<bool, LotfolioError>;

    /// Prices for `ticker` at the requested dates. Dates without a price are
    /// absent from the result; the returned series never holds duplicates.
    fn read(&self, ticker: &str, dates: &[NaiveDate]) -> Result<PriceSeries, LotfolioError>;
}
