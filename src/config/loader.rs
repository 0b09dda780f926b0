//! Configuration loading from disk.

use secrecy::ExposeSecret;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::env::{mask_secret, obscure_url, resolve_env_placeholders};
use crate::config::schema::AppConfig;
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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, resolve and validate configuration from a TOML file.
///
/// `${VAR}` placeholders are substituted from the process environment before
/// the document is deserialized.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut raw: toml::Value = toml::from_str(content)?;
    resolve_env_placeholders(&mut raw);

    let config: AppConfig = raw.try_into()?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Log the resolved configuration with secrets obscured.
pub fn log_resolved_config(config: &AppConfig) {
    for (name, account) in &config.accounts {
        tracing::info!(
            account = %name,
            address = %account.address,
            private_key = %mask_secret(account.private_key.expose_secret()),
            "Account configured"
        );
    }

    for (name, network) in &config.networks {
        tracing::info!(
            network = %name,
            url = %obscure_url(&network.url),
            chain_id = network.chain_id,
            explorer = %network.explorer.as_deref().map(obscure_url).unwrap_or_default(),
            "Network configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [api_server]
            host = "127.0.0.1"
            port = 9000
            log_level = "debug"

            [networks.local]
            url = "http://localhost:8545"
            chain_id = 31337
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api_server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.api_server.log_level, "debug");
        assert_eq!(config.network("local").unwrap().chain_id, 31337);
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/gateway.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_unresolved_secret_survives_parsing() {
        let config = parse_config(
            r#"
            [accounts]
            carol = { address = "0xCarol", private_key = "${GATEWAY_TEST_UNSET_KEY}" }
            "#,
        )
        .unwrap();
        assert_eq!(
            config.accounts["carol"].private_key.expose_secret(),
            "${GATEWAY_TEST_UNSET_KEY}"
        );
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let err = parse_config(
            r#"
            [networks.broken]
            url = "not a url"
            chain_id = 0
            "#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken"));
        assert!(message.contains("chain_id"));
    }
}
