use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utils::log_tail::DEFAULT_TAIL_LINES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many trailing console lines are read from a failed build.
    pub tail_lines: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tail_lines == 0 {
            return Err(ConfigError::ValidationError(
                "tail_lines must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) => match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid config, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse config, using defaults");
                Config::default()
            }
        }
    }
}

/// Read and validate the config at `config_path`. `Ok(None)` when the file
/// does not exist.
pub async fn read_config_file(config_path: &Path) -> Result<Option<Config>, ConfigError> {
    let raw_config = match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => raw_config,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let config: Config = serde_json::from_str(&raw_config)?;
    config.validate()?;
    Ok(Some(config))
}

/// Will always return config, eventually falling back to the default
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match read_config_file(config_path).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!(path = ?config_path, "No config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            tracing::warn!(path = ?config_path, error = %e, "Invalid config file, using defaults");
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    config.validate()?;
    let raw_config = serde_json::to_string_pretty(config)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from(r#"{"log_level":"debug"}"#.to_string());
        assert_eq!(config.tail_lines, 30);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        assert_eq!(Config::from("not json".to_string()), Config::default());
        assert_eq!(
            Config::from(r#"{"tail_lines":0}"#.to_string()),
            Config::default()
        );
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_file(&dir.path().join("absent.json")).await;
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_read_config_file_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config_file(&dir.path().join("absent.json")).await.unwrap().is_none());

        let malformed = dir.path().join("malformed.json");
        tokio::fs::write(&malformed, "{not json").await.unwrap();
        assert!(matches!(
            read_config_file(&malformed).await,
            Err(ConfigError::Json(_))
        ));
        assert_eq!(load_config_from_file(&malformed).await, Config::default());

        let invalid = dir.path().join("invalid.json");
        tokio::fs::write(&invalid, r#"{"tail_lines":0}"#).await.unwrap();
        assert!(matches!(
            read_config_file(&invalid).await,
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            tail_lines: 50,
            log_level: "warn".to_string(),
        };

        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(load_config_from_file(&path).await, config);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            tail_lines: 0,
            ..Config::default()
        };
        let err = save_config_to_file(&config, &dir.path().join("c.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
