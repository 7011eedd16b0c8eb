//! Error taxonomy and the result envelope returned by every entry point

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Bad date ordering, too few tickers, malformed TVM problem, ...
    #[error("{0}")]
    InputValidation(String),

    /// The price provider returned nothing usable
    #[error("{0}")]
    DataUnavailable(String),

    /// Fewer than 2 usable observations after cleaning
    #[error("{0}")]
    InsufficientData(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AnalyticsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AnalyticsError::InputValidation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AnalyticsError::DataUnavailable(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        AnalyticsError::InsufficientData(msg.into())
    }
}

pub type Result<T, E = AnalyticsError> = std::result::Result<T, E>;

/// Uniform response shape: either the populated payload with `"error": null`,
/// or only `"error": "<message>"`. Never both.
#[derive(Debug, Clone)]
pub enum ApiResult<T> {
    Ok(T),
    Err(String),
}

impl<T> ApiResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResult::Ok(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Ok(_) => None,
            ApiResult::Err(msg) => Some(msg),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResult::Ok(value) => Some(value),
            ApiResult::Err(_) => None,
        }
    }
}

impl<T> From<Result<T>> for ApiResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => ApiResult::Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, "request failed");
                ApiResult::Err(e.to_string())
            }
        }
    }
}

impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Populated<'a, T> {
            #[serde(flatten)]
            data: &'a T,
            error: Option<&'a str>,
        }

        #[derive(Serialize)]
        struct Failed<'a> {
            error: &'a str,
        }

        match self {
            ApiResult::Ok(data) => Populated { data, error: None }.serialize(serializer),
            ApiResult::Err(error) => Failed { error }.serialize(serializer),
        }
    }
}
