//! Report generation port trait.

use std::io::Write;

use chrono::NaiveDate;

use crate::domain::error::LotfolioError;
use crate::domain::portfolio::Summary;

/// Port for rendering portfolio results to an output stream.
pub trait ReportPort {
    fn write_summary(&self, summary: &Summary, out: &mut dyn Write) -> Result<(), LotfolioError>;

    /// Date-indexed return series, for consumption by external charting.
    fn write_returns(
        &self,
        returns: &[(NaiveDate, Option<f64>)],
        out: &mut dyn Write,
    ) -> Result<(), LotfolioError>;
}
