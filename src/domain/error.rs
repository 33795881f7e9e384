//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for lotfolio.
#[derive(Debug, thiserror::Error)]
pub enum LotfolioError {
    #[error("{ticker} at {date} cannot have quantity {quantity}")]
    InvalidQuantity {
        ticker: String,
        date: NaiveDate,
        quantity: f64,
    },

    #[error("{ticker} is not a known ticker, asset values cannot be retrieved")]
    InvalidTicker { ticker: String },

    #[error("{date} is a weekend, asset values cannot be retrieved")]
    InvalidDate { ticker: String, date: NaiveDate },

    #[error("no price found for {ticker} at {date} or nearby days")]
    PriceNotFound { ticker: String, date: NaiveDate },

    #[error("positions reference more than one ticker: expected {expected}, found {found}")]
    InconsistentInstrument { expected: String, found: String },

    #[error("no positions are given")]
    EmptyInput,

    #[error("positions for {ticker} are not in date order (at {date})")]
    UnsortedPositions { ticker: String, date: NaiveDate },

    #[error("position for {ticker} at {date} is outside the ledger calendar")]
    DateOutOfRange { ticker: String, date: NaiveDate },

    #[error("invalid price series for {ticker}: {reason}")]
    PriceSeriesInvalid { ticker: String, reason: String },

    #[error("not enough open shares of {ticker} to sell {requested} at {date} (open: {open})")]
    InsufficientShares {
        ticker: String,
        date: NaiveDate,
        requested: f64,
        open: f64,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price store error: {reason}")]
    Store { reason: String },

    #[error("price store query error: {reason}")]
    StoreQuery { reason: String },

    #[error("import error in {file}: {reason}")]
    Import { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LotfolioError> for std::process::ExitCode {
    fn from(err: &LotfolioError) -> Self {
        let code: u8 = match err {
            LotfolioError::Io(_) => 1,
            LotfolioError::ConfigParse { .. }
            | LotfolioError::ConfigMissing { .. }
            | LotfolioError::ConfigInvalid { .. } => 2,
            LotfolioError::Store { .. } | LotfolioError::StoreQuery { .. } => 3,
            LotfolioError::Import { .. } => 4,
            LotfolioError::InvalidQuantity { .. }
            | LotfolioError::InvalidTicker { .. }
            | LotfolioError::InvalidDate { .. }
            | LotfolioError::PriceNotFound { .. } => 5,
            LotfolioError::InconsistentInstrument { .. }
            | LotfolioError::EmptyInput
            | LotfolioError::UnsortedPositions { .. }
            | LotfolioError::DateOutOfRange { .. }
            | LotfolioError::PriceSeriesInvalid { .. }
            | LotfolioError::InsufficientShares { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
