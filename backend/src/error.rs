use thiserror::Error;

use crate::store::StoreError;

/// Domain errors surfaced by the matching engine and proposal lifecycle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("payment failed: {0}")]
    Payment(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        EngineError::InvalidState(reason.into())
    }
}
