//! Config validation
//!
//! Field rules come from the `validator` derives on the config types; the
//! cross-field rules live here:
//! - bucket slugs unique
//! - bucket ids unique when given
//! - forward urls use http or https

use std::collections::HashSet;

use contracts::{ContractError, SplayConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a parsed SplayConfig
///
/// Returns the first error encountered.
pub fn validate(config: &SplayConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error(&errors);
        ContractError::config_validation(field, message)
    })?;
    validate_bucket_slugs(config)?;
    validate_bucket_ids(config)?;
    validate_forward_schemes(config)?;
    Ok(())
}

/// Walk nested errors down to the first leaf, building a dotted path
fn first_error(errors: &ValidationErrors) -> (String, String) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", error.code));
                    return (field.to_string(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                let (path, message) = first_error(inner);
                return (format!("{field}.{path}"), message);
            }
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    let (path, message) = first_error(inner);
                    return (format!("{field}[{idx}].{path}"), message);
                }
            }
        }
    }
    ("<root>".to_string(), "invalid configuration".to_string())
}

fn validate_bucket_slugs(config: &SplayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for bucket in &config.buckets {
        if !seen.insert(bucket.slug.as_str()) {
            return Err(ContractError::config_validation(
                format!("buckets[slug={}]", bucket.slug),
                "duplicate bucket slug",
            ));
        }
    }
    Ok(())
}

fn validate_bucket_ids(config: &SplayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for id in config.buckets.iter().filter_map(|b| b.id.as_deref()) {
        if !seen.insert(id) {
            return Err(ContractError::config_validation(
                format!("buckets[id={id}]"),
                "duplicate bucket id",
            ));
        }
    }
    Ok(())
}

fn validate_forward_schemes(config: &SplayConfig) -> Result<(), ContractError> {
    for bucket in &config.buckets {
        for (idx, forward) in bucket.forwards.iter().enumerate() {
            let url = forward.url.to_ascii_lowercase();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ContractError::config_validation(
                    format!("buckets[{}].forwards[{idx}].url", bucket.slug),
                    format!("'{}' must be an http(s) url", forward.url),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BucketConfig, ForwardTargetConfig};

    fn bucket(slug: &str) -> BucketConfig {
        BucketConfig {
            id: None,
            slug: slug.into(),
            name: String::new(),
            description: String::new(),
            user: "u1".into(),
            forwards: vec![ForwardTargetConfig {
                name: "a".into(),
                url: "http://localhost:9090/hook".into(),
            }],
        }
    }

    fn minimal_config() -> SplayConfig {
        SplayConfig {
            buckets: vec![bucket("b1")],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_duplicate_slug() {
        let mut config = minimal_config();
        config.buckets.push(bucket("b1"));
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate bucket slug"), "got: {err}");
    }

    #[test]
    fn test_duplicate_bucket_id() {
        let mut config = minimal_config();
        config.buckets[0].id = Some("same".into());
        let mut second = bucket("b2");
        second.id = Some("same".into());
        config.buckets.push(second);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate bucket id"), "got: {err}");
    }

    #[test]
    fn test_non_http_forward_url() {
        let mut config = minimal_config();
        config.buckets[0].forwards[0].url = "ftp://example.com/drop".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("http(s)"), "got: {err}");
    }

    #[test]
    fn test_zero_timeout_reports_path() {
        let mut config = minimal_config();
        config.forward.timeout_secs = 0;
        let err = validate(&config).unwrap_err();
        match err {
            ContractError::ConfigValidation { field, .. } => {
                assert_eq!(field, "forward.timeout_secs")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_user_reports_list_path() {
        let mut config = minimal_config();
        config.buckets[0].user = String::new();
        let err = validate(&config).unwrap_err();
        match err {
            ContractError::ConfigValidation { field, .. } => {
                assert_eq!(field, "buckets[0].user")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
