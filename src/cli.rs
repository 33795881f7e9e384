//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::adapters::text_report::TextReportAdapter;
use crate::adapters::transactions_csv;
use crate::domain::calendar::{self, WeekendFilter};
use crate::domain::error::LotfolioError;
use crate::domain::ledger::{Ledger, LedgerConfig};
use crate::domain::portfolio::Portfolio;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "lotfolio", about = "Lot-level portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a transaction export into a normalized transaction table
    Parse {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the portfolio summary
    Summary {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        /// Benchmark symbol, overriding the configured one
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write the portfolio return series for external charting
    Returns {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Export a single instrument's series instead of the portfolio's
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Load a ticker,date,price CSV into the price store
    ImportPrices {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored quote ranges for one or all tickers
    Info {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Parse { file } => run_parse(&file),
        Command::Summary {
            file,
            config,
            benchmark,
            format,
        } => run_summary(&file, &config, benchmark.as_deref(), format),
        Command::Returns {
            file,
            config,
            output,
            ticker,
            format,
        } => run_returns(&file, &config, output.as_ref(), ticker.as_deref(), format),
        Command::ImportPrices { file, config } => run_import_prices(&file, &config),
        Command::Info { ticker, config } => run_info(ticker.as_deref(), &config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = LotfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// The weekend filter is deliberately a required key: the calendar never
/// guesses whether weekend days belong on the axis.
pub fn build_ledger_config(config: &dyn ConfigPort) -> Result<LedgerConfig, LotfolioError> {
    let weekends_raw = config.get_string("portfolio", "skip_weekends").ok_or_else(|| {
        LotfolioError::ConfigMissing {
            section: "portfolio".into(),
            key: "skip_weekends".into(),
        }
    })?;
    let weekends = match FileConfigAdapter::parse_bool(&weekends_raw) {
        Some(true) => WeekendFilter::Skip,
        Some(false) => WeekendFilter::Keep,
        None => {
            return Err(LotfolioError::ConfigInvalid {
                section: "portfolio".into(),
                key: "skip_weekends".into(),
                reason: format!("expected a boolean, got '{weekends_raw}'"),
            });
        }
    };

    let today = match config.get_string("portfolio", "today") {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            LotfolioError::ConfigInvalid {
                section: "portfolio".into(),
                key: "today".into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            }
        })?,
        None => calendar::today(),
    };

    Ok(LedgerConfig { today, weekends })
}

pub fn build_portfolio(
    file: &PathBuf,
    config: &dyn ConfigPort,
    benchmark_override: Option<&str>,
    prices: &dyn PricePort,
) -> Result<Portfolio, LotfolioError> {
    let ledger_config = build_ledger_config(config)?;
    let default_commission = config.get_double("portfolio", "default_commission", 0.0);

    eprintln!("Parsing transactions from {}", file.display());
    let records = transactions_csv::parse_file(file)?;
    let grouped = transactions_csv::grouped_positions(&records, default_commission, prices)?;

    let mut ledgers = Vec::with_capacity(grouped.len());
    for (ticker, positions) in grouped {
        eprintln!("  {}: {} transactions", ticker, positions.len());
        ledgers.push(Ledger::build(positions, ledger_config, prices)?);
    }

    let benchmark = benchmark_override
        .map(str::to_string)
        .or_else(|| config.get_string("portfolio", "benchmark"));

    match benchmark {
        Some(symbol) => Portfolio::with_benchmark(ledgers, &symbol, ledger_config, prices),
        None => Ok(Portfolio::new(ledgers)),
    }
}

fn report_adapter(format: OutputFormat) -> Box<dyn ReportPort> {
    match format {
        OutputFormat::Text => Box::new(TextReportAdapter),
        OutputFormat::Json => Box::new(JsonReportAdapter),
    }
}

fn run_parse(file: &PathBuf) -> ExitCode {
    let records = match transactions_csv::parse_file(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match serde_json::to_string_pretty(&records) {
        Ok(json) => {
            println!("{json}");
            eprintln!("{} transactions parsed", records.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize transactions: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_summary(
    file: &PathBuf,
    config_path: &PathBuf,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_price_adapter::SqlitePriceAdapter;

        let prices = match SqlitePriceAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let portfolio = match build_portfolio(file, &config, benchmark, &prices) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let summary = portfolio.summary();
        let mut stdout = std::io::stdout();
        match report_adapter(format).write_summary(&summary, &mut stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (file, benchmark, format, config);
        eprintln!("error: sqlite feature is required for summary");
        ExitCode::from(1)
    }
}

fn run_returns(
    file: &PathBuf,
    config_path: &PathBuf,
    output: Option<&PathBuf>,
    ticker: Option<&str>,
    format: OutputFormat,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_price_adapter::SqlitePriceAdapter;
        use std::fs::File;

        let prices = match SqlitePriceAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let portfolio = match build_portfolio(file, &config, None, &prices) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let returns = match ticker {
            Some(symbol) => {
                let symbol = symbol.to_uppercase();
                match portfolio
                    .ledgers()
                    .iter()
                    .find(|l| l.ticker() == symbol)
                {
                    Some(ledger) => ledger
                        .dates()
                        .iter()
                        .copied()
                        .zip(ledger.returns())
                        .collect(),
                    None => {
                        eprintln!("error: {symbol} is not part of this portfolio");
                        return ExitCode::from(1);
                    }
                }
            }
            None => portfolio.returns(),
        };
        let adapter = report_adapter(format);
        let result = match output {
            Some(path) => match File::create(path) {
                Ok(mut file) => adapter.write_returns(&returns, &mut file),
                Err(e) => {
                    eprintln!("error: failed to create {}: {e}", path.display());
                    return ExitCode::from(1);
                }
            },
            None => adapter.write_returns(&returns, &mut std::io::stdout()),
        };

        match result {
            Ok(()) => {
                if let Some(path) = output {
                    eprintln!("Returns written to {}", path.display());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (file, output, ticker, format, config);
        eprintln!("error: sqlite feature is required for returns");
        ExitCode::from(1)
    }
}

fn run_import_prices(file: &PathBuf, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::price_csv;
        use crate::adapters::sqlite_price_adapter::SqlitePriceAdapter;

        let rows = match price_csv::parse_file(file) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let store = match SqlitePriceAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        match store.insert_prices(&rows) {
            Ok(()) => {
                eprintln!("{} quotes imported", rows.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (file, config);
        eprintln!("error: sqlite feature is required for import-prices");
        ExitCode::from(1)
    }
}

fn run_info(ticker: Option<&str>, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_price_adapter::SqlitePriceAdapter;

        let store = match SqlitePriceAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let tickers = match ticker {
            Some(t) => vec![t.to_uppercase()],
            None => match store.tickers() {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            },
        };

        if tickers.is_empty() {
            eprintln!("No quotes stored");
            return ExitCode::SUCCESS;
        }

        for t in &tickers {
            match store.data_range(t) {
                Ok(Some((min, max, count))) => {
                    println!("{}: {} quotes, {} to {}", t, count, min, max);
                }
                Ok(None) => {
                    eprintln!("{}: no quotes found", t);
                }
                Err(e) => {
                    eprintln!("error querying {}: {}", t, e);
                }
            }
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (ticker, config);
        eprintln!("error: sqlite feature is required for info");
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig {
        entries: Vec<((String, String), String)>,
    }

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            }
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.entries
                .iter()
                .find(|((s, k), _)| s == section && k == key)
                .map(|(_, v)| v.clone())
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn ledger_config_requires_weekend_key() {
        let config = MapConfig::new(&[]);
        let result = build_ledger_config(&config);
        assert!(matches!(
            result,
            Err(LotfolioError::ConfigMissing { section, key })
                if section == "portfolio" && key == "skip_weekends"
        ));
    }

    #[test]
    fn ledger_config_rejects_non_boolean_weekend_value() {
        let config = MapConfig::new(&[("portfolio", "skip_weekends", "sometimes")]);
        let result = build_ledger_config(&config);
        assert!(matches!(result, Err(LotfolioError::ConfigInvalid { .. })));
    }

    #[test]
    fn ledger_config_parses_filter_and_today() {
        let config = MapConfig::new(&[
            ("portfolio", "skip_weekends", "true"),
            ("portfolio", "today", "2022-04-13"),
        ]);
        let ledger_config = build_ledger_config(&config).unwrap();
        assert_eq!(ledger_config.weekends, WeekendFilter::Skip);
        assert_eq!(
            ledger_config.today,
            NaiveDate::from_ymd_opt(2022, 4, 13).unwrap()
        );
    }

    #[test]
    fn ledger_config_defaults_today_to_now() {
        let config = MapConfig::new(&[("portfolio", "skip_weekends", "no")]);
        let ledger_config = build_ledger_config(&config).unwrap();
        assert_eq!(ledger_config.weekends, WeekendFilter::Keep);
        assert_eq!(ledger_config.today, calendar::today());
    }

    #[test]
    fn ledger_config_rejects_bad_today() {
        let config = MapConfig::new(&[
            ("portfolio", "skip_weekends", "false"),
            ("portfolio", "today", "13/04/2022"),
        ]);
        let result = build_ledger_config(&config);
        assert!(matches!(
            result,
            Err(LotfolioError::ConfigInvalid { key, .. }) if key == "today"
        ));
    }
}
