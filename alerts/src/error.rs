use thiserror::Error;

use market::SignalError;

/// An alert definition that cannot be turned into a [`crate::Condition`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown condition kind: {0}")]
    UnknownCondition(String),

    #[error("alert '{alert}' has no symbol")]
    MissingSymbol { alert: String },

    #[error("{kind}: missing required parameter '{param}'")]
    MissingParam { kind: &'static str, param: &'static str },

    #[error("{kind}: invalid parameters: {reason}")]
    InvalidParams { kind: &'static str, reason: String },
}

/// A condition that could not be evaluated against the fetched series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("no data available")]
    NoData,

    #[error("insufficient data (need {required} samples, have {available})")]
    InsufficientData { required: usize, available: usize },

    #[error("reference price is not positive ({0})")]
    InvalidPrice(f64),

    #[error(transparent)]
    Signal(#[from] SignalError),
}
