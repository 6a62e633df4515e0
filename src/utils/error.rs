//! Crate-wide error type
//!
//! Every failure in the action funnels into `ApiError`. Remote failures keep
//! the orchestration step that produced them so the outer boundary can log
//! which call in the chain broke instead of a bare boolean.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input detected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote catalog lookup came back empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// The SELECT list contains a token shape the rewriter does not handle
    #[error("SQL function not supported: {0}")]
    UnsupportedSql(String),

    /// Non-success response from the Sisu REST API
    #[error("Sisu API error during {step}: {message}")]
    Remote { step: &'static str, message: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unsupported_sql(token: impl Into<String>) -> Self {
        Self::UnsupportedSql(token.into())
    }

    pub fn remote(step: &'static str, message: impl Into<String>) -> Self {
        Self::Remote { step, message: message.into() }
    }

    /// The orchestration step a remote failure belongs to, if any
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::Remote { step, .. } => Some(step),
            _ => None,
        }
    }
}
