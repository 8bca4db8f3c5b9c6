//! Error types for the notification center.

use thiserror::Error;

/// Error returned by a subscriber callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every subscriber callback.
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Main error type for notification center operations.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Callback for '{name}' failed: {source}")]
    Callback {
        name: String,
        #[source]
        source: CallbackError,
    },
}

impl NotificationError {
    pub(crate) fn empty_name() -> Self {
        NotificationError::InvalidArgument("notification name must not be empty".to_string())
    }
}

/// Result type for notification center operations.
pub type Result<T> = std::result::Result<T, NotificationError>;
