//! JSON report adapter, for piping results into other tooling.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::LotfolioError;
use crate::domain::portfolio::Summary;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

#[derive(Serialize)]
struct ReturnPoint {
    date: NaiveDate,
    returns: Option<f64>,
}

fn json_error(e: serde_json::Error) -> LotfolioError {
    LotfolioError::Io(std::io::Error::other(e))
}

impl ReportPort for JsonReportAdapter {
    fn write_summary(&self, summary: &Summary, out: &mut dyn Write) -> Result<(), LotfolioError> {
        serde_json::to_writer_pretty(&mut *out, summary).map_err(json_error)?;
        writeln!(out)?;
        Ok(())
    }

    fn write_returns(
        &self,
        returns: &[(NaiveDate, Option<f64>)],
        out: &mut dyn Write,
    ) -> Result<(), LotfolioError> {
        let points: Vec<ReturnPoint> = returns
            .iter()
            .map(|&(date, returns)| ReturnPoint { date, returns })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &points).map_err(json_error)?;
        writeln!(out)?;
        Ok(())
    }
}
