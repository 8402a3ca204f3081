//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable consulted for the Figma API token.
///
/// The environment always wins over the configuration file so that tokens
/// never have to be written to disk.
pub const TOKEN_ENV_VAR: &str = "FIGMA_API_KEY";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Figma API settings.
    #[serde(default)]
    pub figma: FigmaConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::ValidationError {
                message: "cache.max_entries must be greater than zero".to_string(),
            });
        }
        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "cache.ttl_seconds must be greater than zero".to_string(),
            });
        }
        if self.figma.api_base.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "figma.api_base must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolves the Figma API token from the environment or the config file.
    ///
    /// Empty strings count as absent in both places.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if no token is configured anywhere.
    pub fn resolve_token(&self) -> Result<String, ConfigError> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }

        match &self.figma.token {
            Some(token) if !token.trim().is_empty() => Ok(token.clone()),
            _ => Err(ConfigError::MissingToken),
        }
    }
}

/// Figma API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FigmaConfig {
    /// Personal access token. Overridden by the `FIGMA_API_KEY` environment
    /// variable when that is set.
    #[serde(default)]
    pub token: Option<String>,

    /// Base URL of the Figma REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.figma.com".to_string()
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Hard maximum number of cached upstream responses.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Time-to-live for each cache entry, in seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

const fn default_max_entries() -> usize {
    500
}

const fn default_ttl_seconds() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "figma": {
                "token": "figd_test",
                "api_base": "https://api.figma.com"
            },
            "cache": {
                "max_entries": 100,
                "ttl_seconds": 60
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.figma.token.as_deref(), Some("figd_test"));
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 500);
        assert_eq!(config.ttl_seconds, 300);
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_zero_cache_capacity() {
        let json = r#"{ "cache": { "max_entries": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{ "unknown_field": "value" }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn file_token_used_when_env_unset() {
        // Serial access to the environment is not guaranteed across test
        // threads; use a name no other test writes.
        let json = r#"{ "figma": { "token": "figd_from_file" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            assert_eq!(config.resolve_token().unwrap(), "figd_from_file");
        }
    }

    #[test]
    fn missing_token_is_an_error() {
        let config: Config = serde_json::from_str("{}").unwrap();
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            assert!(matches!(
                config.resolve_token(),
                Err(ConfigError::MissingToken)
            ));
        }
    }
}
