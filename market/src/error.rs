use thiserror::Error;

/// Why a signal could not be computed from a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("insufficient data (need {required} samples, have {available})")]
    InsufficientData { required: usize, available: usize },

    #[error("moving average is not positive ({0})")]
    NonPositiveAverage(f64),

    #[error("window length must be at least 1")]
    ZeroWindow,
}

/// Failures talking to a market-data or ticker-universe provider.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("empty series for {0}")]
    EmptySeries(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{symbol}: {source}")]
    Signal {
        symbol: String,
        #[source]
        source: SignalError,
    },
}

impl MarketError {
    pub fn signal(symbol: impl Into<String>, source: SignalError) -> Self {
        MarketError::Signal {
            symbol: symbol.into(),
            source,
        }
    }

    /// True when the provider answered but had too little history.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            MarketError::Signal {
                source: SignalError::InsufficientData { .. },
                ..
            }
        )
    }
}
