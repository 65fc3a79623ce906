//! Config parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, SplayConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<SplayConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<SplayConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<SplayConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_fills_defaults() {
        let content = r#"
[[buckets]]
slug = "b1"
user = "u1"

[[buckets.forwards]]
name = "a"
url = "http://localhost:9090/a"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.notify.ttl_ms, 2000);
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].forwards[0].name, "a");
    }

    #[test]
    fn test_parse_json() {
        let content = r#"{
            "server": { "port": 9000, "ingest_token": "secret" },
            "buckets": [{ "slug": "b1", "user": "u1", "forwards": [] }]
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.ingest_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_required_bucket_field() {
        let err = parse_toml("[[buckets]]\nslug = \"b1\"\n").unwrap_err();
        assert!(err.to_string().contains("user"), "got: {err}");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
