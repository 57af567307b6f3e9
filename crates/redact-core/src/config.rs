//! Configuration management.
//!
//! Loads `${REDACT_HOME}/config.toml` with sensible defaults, then applies
//! environment overrides (env > config > default).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::DEFAULT_BASE_URL;
use crate::models;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the redaction backend.
    pub backend_url: String,
    /// Model label sent with summarize/follow-up requests.
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BASE_URL.to_string(),
            model: models::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when absent, then
    /// applies `REDACT_BACKEND_URL` / `REDACT_MODEL` overrides.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(value) = std::env::var("REDACT_BACKEND_URL") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                config.backend_url = trimmed.to_string();
            }
        }
        if let Ok(value) = std::env::var("REDACT_MODEL") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                config.model = trimmed.to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates resolved values.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend URL: {}", self.backend_url))?;
        if !models::is_known_model(&self.model) {
            tracing::warn!(model = %self.model, "model label not in the known catalog");
        }
        Ok(())
    }
}

/// Returns the config directory: `$REDACT_HOME`, or `~/.redact`.
pub fn config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("REDACT_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".redact")
}

/// Path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.backend_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, models::DEFAULT_MODEL);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(r#"backend_url = "http://10.0.0.5:9000""#).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.5:9000");
        assert_eq!(config.model, models::DEFAULT_MODEL);
    }

    #[test]
    fn test_load_reads_file_and_applies_env_override() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "backend_url = \"http://10.1.1.1:8000\"\nmodel = \"Gemini 2.5 Pro\"\n",
        )
        .unwrap();
        // SAFETY: this is the only test touching these variables.
        unsafe {
            std::env::set_var("REDACT_HOME", temp.path());
            std::env::set_var("REDACT_MODEL", "Gemini 2.5 Flash");
        }

        let config = Config::load().unwrap();

        unsafe {
            std::env::remove_var("REDACT_HOME");
            std::env::remove_var("REDACT_MODEL");
        }

        assert_eq!(config.backend_url, "http://10.1.1.1:8000");
        // env beats the file
        assert_eq!(config.model, "Gemini 2.5 Flash");
    }

    #[test]
    fn test_invalid_backend_url_is_rejected() {
        let config = Config {
            backend_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
