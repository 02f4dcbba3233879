//! Handler-level error type

use super::ApiError;
use super::RegistrationError;
use super::StoreError;

/// Errors that abort handling of a single update.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Bot API call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Team registration failed for a reason other than bad input.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),
}

impl From<async_sqlite::Error> for BotError {
    fn from(err: async_sqlite::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}
