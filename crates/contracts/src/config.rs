//! SplayConfig - Config Loader output
//!
//! Describes the complete service configuration: listener, forwarding,
//! notification debounce, observability and seeded buckets.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SplayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// HTTP listener
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Forward delivery tuning
    #[serde(default)]
    #[validate(nested)]
    pub forward: ForwardConfig,

    /// Realtime notification debounce
    #[serde(default)]
    #[validate(nested)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Buckets loaded into the in-process store at startup
    #[serde(default)]
    #[validate(nested)]
    pub buckets: Vec<BucketConfig>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Bearer token required on ingestion requests (None = open)
    #[serde(default)]
    pub ingest_token: Option<String>,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 2))]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ingest_token: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Forward delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForwardConfig {
    /// Per-delivery deadline
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// Deliveries allowed in flight across all events
    #[serde(default = "default_max_in_flight")]
    #[validate(range(min = 1))]
    pub max_in_flight: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    64
}

fn default_user_agent() -> String {
    concat!("splay/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ForwardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_in_flight: default_max_in_flight(),
            user_agent: default_user_agent(),
        }
    }
}

/// Notification debounce configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotifyConfig {
    /// Settling window between first activity and the refresh signal
    #[serde(default = "default_ttl_ms")]
    #[validate(range(min = 1))]
    pub ttl_ms: u64,

    /// Broadcast loop wake interval
    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    /// Per-client outbound message buffer
    #[serde(default = "default_client_buffer")]
    #[validate(range(min = 1))]
    pub client_buffer: usize,
}

fn default_ttl_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_client_buffer() -> usize {
    64
}

impl NotifyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            client_buffer: default_client_buffer(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Seeded bucket
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BucketConfig {
    /// Store id; generated when omitted
    #[serde(default)]
    pub id: Option<String>,

    #[validate(length(min = 1))]
    pub slug: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Owning user id
    #[validate(length(min = 1))]
    pub user: String,

    #[serde(default)]
    #[validate(nested)]
    pub forwards: Vec<ForwardTargetConfig>,
}

/// Seeded forward target
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForwardTargetConfig {
    #[serde(default)]
    pub name: String,

    #[validate(url)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SplayConfig::default();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.forward.timeout(), Duration::from_secs(10));
        assert_eq!(config.notify.poll_interval(), Duration::from_secs(1));
        assert!(config.forward.user_agent.starts_with("splay/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_validation_reaches_forward_urls() {
        let mut config = SplayConfig::default();
        config.buckets.push(BucketConfig {
            id: None,
            slug: "b1".into(),
            name: String::new(),
            description: String::new(),
            user: "u1".into(),
            forwards: vec![ForwardTargetConfig {
                name: "bad".into(),
                url: "not a url".into(),
            }],
        });
        assert!(config.validate().is_err());
    }
}
