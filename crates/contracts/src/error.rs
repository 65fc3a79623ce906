//! Layered error definitions
//!
//! Categorized by source: config / store / transport / serialization / realtime

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Store Errors =====
    /// A store operation failed
    #[error("store {operation} failed: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    // ===== Transport Errors =====
    /// Destination URL could not be turned into a request
    #[error("invalid destination url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Delivery deadline expired
    #[error("delivery to '{url}' timed out after {timeout_ms}ms")]
    TransportTimeout { url: String, timeout_ms: u64 },

    /// Connection refused, DNS failure, reset, ...
    #[error("delivery to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    // ===== Serialization Errors =====
    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ===== Realtime Errors =====
    /// Message could not be handed to a realtime client
    #[error("realtime client '{client_id}' rejected message: {message}")]
    RealtimeSend { client_id: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Store {
            operation,
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create realtime send error
    pub fn realtime_send(client_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RealtimeSend {
            client_id: client_id.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the delivery layer rather than from us
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::TransportTimeout { .. } | Self::Transport { .. }
        )
    }
}
