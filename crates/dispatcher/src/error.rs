//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client could not be constructed
    #[error("failed to build http transport: {message}")]
    TransportBuild { message: String },

    /// In-flight dispatches did not finish within the grace period
    #[error("shutdown grace period expired with {pending} dispatch task(s) still running")]
    ShutdownTimeout { pending: usize },

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn transport_build(message: impl Into<String>) -> Self {
        Self::TransportBuild {
            message: message.into(),
        }
    }
}
