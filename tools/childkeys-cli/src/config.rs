//! CLI configuration.

use anyhow::{Context, Result};
use childkeys_core::FetchOptions;
use childkeys_observability::LoggingConfig;
use serde::Deserialize;

/// CLI configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Defaults for every fetch.
    #[serde(default)]
    pub fetch: FetchOptions,

    /// Log subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))?
        };

        config
            .fetch
            .validate()
            .with_context(|| format!("Invalid [fetch] section in {}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use childkeys_observability::{LogFormat, LogLevel};

    use super::*;

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("childkeys-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_toml() {
        let path = scratch_file(
            "full.toml",
            r#"
[fetch]
max_tries = 3
retry_interval_ms = 250
timeout_ms = 5000

[logging]
level = "debug"
format = "json"
"#,
        );
        let config = ClientConfig::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.fetch.max_tries, 3);
        assert_eq!(config.fetch.retry_interval_ms, 250);
        assert_eq!(config.fetch.timeout_ms, Some(5000));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_json_with_defaults() {
        let path = scratch_file("partial.json", r#"{"fetch": {"access_token": "tok"}}"#);
        let config = ClientConfig::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.fetch.max_tries, 1);
        assert_eq!(config.fetch.retry_interval_ms, 1000);
        assert_eq!(config.fetch.access_token.as_deref(), Some("tok"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_fetch_section_rejected() {
        let path = scratch_file("zero.toml", "[fetch]\nmax_tries = 0\n");
        let err = ClientConfig::load(path.to_str().unwrap()).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(format!("{:#}", err).contains("Invalid [fetch] section"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let path = scratch_file("typo.toml", "[fetch]\nmax_trys = 3\n");
        assert!(ClientConfig::load(path.to_str().unwrap()).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::load("/nonexistent/childkeys.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
