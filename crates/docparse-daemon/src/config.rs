//! Configuration loading for docparse-daemon.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use docparse_core::LabelLocale;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub server: Option<ServerConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ServerConfig {
    pub listen: Option<String>,
    pub workers: Option<usize>,
    pub parse_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ExtractionConfig {
    pub labels: Option<LabelLocale>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
}

/// Listen on all interfaces, port 50051
pub const DEFAULT_LISTEN: &str = "0.0.0.0:50051";

pub const DEFAULT_WORKERS: usize = 10;

impl Config {
    pub fn listen_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.listen.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
    }

    /// Worker pool size, at least one
    pub fn workers(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.workers)
            .unwrap_or(DEFAULT_WORKERS)
            .max(1)
    }

    /// Per-parse deadline. `None` (the default) lets a parse run to completion.
    pub fn parse_timeout(&self) -> Option<Duration> {
        self.server
            .as_ref()
            .and_then(|s| s.parse_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn label_locale(&self) -> LabelLocale {
        self.extraction
            .as_ref()
            .and_then(|e| e.labels)
            .unwrap_or_default()
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.as_ref().and_then(|l| l.file.clone())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "docparse").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).context("Failed to parse config file as TOML")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:50051");
        assert_eq!(config.workers(), 10);
        assert!(config.parse_timeout().is_none());
        assert_eq!(config.label_locale(), LabelLocale::Zh);
        assert!(config.log_file().is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:6000"
            workers = 4
            parse_timeout_secs = 120

            [extraction]
            labels = "en"

            [logging]
            file = "/var/log/docparse.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:6000");
        assert_eq!(config.workers(), 4);
        assert_eq!(config.parse_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.label_locale(), LabelLocale::En);
        assert_eq!(
            config.log_file().as_deref(),
            Some(Path::new("/var/log/docparse.log"))
        );
    }

    #[test]
    fn test_zero_values_fall_back() {
        let config = Config {
            server: Some(ServerConfig {
                workers: Some(0),
                parse_timeout_secs: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.workers(), 1);
        assert!(config.parse_timeout().is_none());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.workers(), DEFAULT_WORKERS);
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nlisten = ").unwrap();
        assert!(load_config(&path).is_err());
    }
}
