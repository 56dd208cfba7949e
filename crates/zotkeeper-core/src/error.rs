use thiserror::Error;

use crate::models::RecordKey;

/// Errors surfaced by the remote library gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("record not found: {0}")]
    NotFound(RecordKey),

    #[error("version conflict on {key}: expected {expected}, library has {found}")]
    VersionConflict {
        key: RecordKey,
        expected: u64,
        found: u64,
    },

    #[error("invalid record payload: {0}")]
    InvalidRecord(String),

    #[error("gateway transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
