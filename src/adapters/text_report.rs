//! Console report adapter: an aligned summary table and a CSV return
//! series.

use std::io::Write;

use chrono::NaiveDate;

use crate::domain::error::LotfolioError;
use crate::domain::portfolio::Summary;
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

impl ReportPort for TextReportAdapter {
    fn write_summary(&self, summary: &Summary, out: &mut dyn Write) -> Result<(), LotfolioError> {
        writeln!(
            out,
            "{:<8} {:>12} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12} {:>12}",
            "ticker",
            "value",
            "returns%",
            "open",
            "closed",
            "total",
            "avg cost",
            "profit/loss",
            "unrealized",
        )?;
        for row in &summary.tickers {
            writeln!(
                out,
                "{:<8} {:>12.2} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12.2} {:>12.2}",
                row.ticker,
                row.value,
                fmt_opt(row.returns),
                row.open_shares,
                row.closed_shares,
                row.total_shares,
                fmt_opt(row.average_cost_per_share),
                row.profit_loss,
                row.unrealized_gain,
            )?;
        }
        writeln!(out)?;
        writeln!(out, "total value:       {:.2}", summary.total_value)?;
        writeln!(
            out,
            "portfolio returns: {}%",
            fmt_opt(summary.portfolio_returns)
        )?;
        if summary.benchmark_returns.is_some() {
            writeln!(
                out,
                "benchmark returns: {}%",
                fmt_opt(summary.benchmark_returns)
            )?;
        }
        Ok(())
    }

    fn write_returns(
        &self,
        returns: &[(NaiveDate, Option<f64>)],
        out: &mut dyn Write,
    ) -> Result<(), LotfolioError> {
        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record(["date", "returns"])
            .map_err(csv_error)?;
        for (date, value) in returns {
            let rendered = value.map(|v| v.to_string()).unwrap_or_default();
            writer
                .write_record([date.format("%Y-%m-%d").to_string(), rendered])
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> LotfolioError {
    LotfolioError::Io(std::io::Error::other(e))
}
