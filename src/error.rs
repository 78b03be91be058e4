//! Error taxonomy for the loss-mitigation core.
//!
//! Sampling failures are split by kind so a caller can tell a bad
//! configuration (unknown distribution, missing or out-of-domain parameter)
//! apart from a parameter of the wrong type. Analysis failures cover inputs
//! for which a statistic is undefined.

use thiserror::Error;

/// Failure while building a distribution or drawing a loss sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    /// Unknown distribution name, missing parameter, or a parameter outside
    /// the distribution's domain.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parameter was supplied with the wrong kind of value.
    #[error("type error: parameter '{parameter}' must be {expected}, got {found}")]
    Type {
        parameter: String,
        expected: &'static str,
        found: String,
    },
}

impl SamplingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Failure while summarising a set of losses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("empty input: {context} is undefined for an empty sequence")]
    EmptyInput { context: &'static str },

    #[error("percentile {0} outside [0, 100]")]
    PercentileOutOfRange(f64),
}

/// Top-level error for configuration loading and scenario runs.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("io error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
