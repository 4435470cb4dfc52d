use thiserror::Error;

/// Why a tuning string could not be turned into an interval list
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("empty tuning")]
    Empty,
    #[error("unrecognized tuning token '{0}'")]
    InvalidToken(String),
    #[error("zero or negative ratio in '{0}'")]
    InvalidRatio(String),
    #[error("zero divisions in '{0}'")]
    ZeroDivisions(String),
    #[error("tuning grammar does not compile: {0}")]
    Grammar(String),
}
