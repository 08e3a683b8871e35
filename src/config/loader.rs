//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("edge-gateway-{}.toml", std::process::id()));
        fs::write(
            &path,
            r#"
            [upstream]
            origin = "https://origin.internal"

            [access]
            blocked_ips = ["203.0.113.7"]
            blocked_regions = ["KP"]

            [rate_limit]
            max_requests = 5
            window_secs = 10
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.access.blocked_ips, vec!["203.0.113.7"]);
        assert_eq!(config.access.blocked_regions, vec!["KP"]);
        assert_eq!(config.rate_limit.max_requests, 5);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/edge-gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config(
            r#"
            [rate_limit]
            max_requests = 0
            window_secs = 0
            "#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("max_requests"));
        assert!(message.contains("window_secs"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse_config("[rate_limit\nenabled = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
