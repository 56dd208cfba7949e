use thiserror::Error;

use zotkeeper_core::GatewayError;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("identifier not found: {0}")]
    NotFound(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, ReconError>;
