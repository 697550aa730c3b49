//! Configuration management for the Podflow CLI
//!
//! Handles loading and saving configuration from ~/.podflow/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use services::services::{config::WorkbenchConfig, stage::Stage};

/// Configuration for the Podflow CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub docs_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_slot_key")]
    pub slot_key: String,

    #[serde(default)]
    pub default_episode: Option<String>,

    #[serde(default = "default_stage")]
    pub default_stage: String,

    #[serde(default)]
    pub timeline_seconds: Option<f64>,
}

fn default_slot_key() -> String {
    services::services::config::DEFAULT_SLOT_KEY.to_string()
}

fn default_stage() -> String {
    Stage::Blog.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            slot_key: default_slot_key(),
            default_episode: None,
            default_stage: default_stage(),
            timeline_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub color: bool,

    #[serde(default = "default_true")]
    pub show_checks: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_checks: true,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".podflow")
            .join("config.toml")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a configuration value by key path (e.g., "remote.api_url")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["remote", "api_url"] => self.remote.api_url.clone(),
            ["remote", "docs_url"] => self.remote.docs_url.clone(),
            ["remote", "api_key"] => self.remote.api_key.clone(),
            ["session", "slot_key"] => Some(self.session.slot_key.clone()),
            ["session", "default_episode"] => self.session.default_episode.clone(),
            ["session", "default_stage"] => Some(self.session.default_stage.clone()),
            ["session", "timeline_seconds"] => {
                self.session.timeline_seconds.map(|s| s.to_string())
            }
            ["display", "color"] => Some(self.display.color.to_string()),
            ["display", "show_checks"] => Some(self.display.show_checks.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key path. Does not write the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let optional = || {
            let v = value.trim();
            (!v.is_empty()).then(|| v.to_string())
        };

        match parts.as_slice() {
            ["remote", "api_url"] => self.remote.api_url = optional(),
            ["remote", "docs_url"] => self.remote.docs_url = optional(),
            ["remote", "api_key"] => self.remote.api_key = optional(),
            ["session", "slot_key"] => {
                if value.trim().is_empty() {
                    anyhow::bail!("session.slot_key cannot be empty");
                }
                self.session.slot_key = value.trim().to_string()
            }
            ["session", "default_episode"] => self.session.default_episode = optional(),
            ["session", "default_stage"] => {
                let stage: Stage = value.parse().map_err(anyhow::Error::msg)?;
                self.session.default_stage = stage.to_string()
            }
            ["session", "timeline_seconds"] => {
                let seconds: f64 = value
                    .parse()
                    .with_context(|| format!("Not a number: {}", value))?;
                if !seconds.is_finite() || seconds <= 0.0 {
                    anyhow::bail!("session.timeline_seconds must be positive");
                }
                self.session.timeline_seconds = Some(seconds)
            }
            ["display", "color"] => self.display.color = value.parse().unwrap_or(true),
            ["display", "show_checks"] => {
                self.display.show_checks = value.parse().unwrap_or(true)
            }
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }

        Ok(())
    }

    /// Engine configuration: environment variables first, then this file.
    pub fn workbench_config(&self, offline: bool) -> WorkbenchConfig {
        let mut config = WorkbenchConfig::default();
        if offline {
            config.api_url = None;
            config.docs_url = None;
        } else {
            config.api_url = config.api_url.or_else(|| self.remote.api_url.clone());
            config.docs_url = config.docs_url.or_else(|| self.remote.docs_url.clone());
        }
        config.api_key = config.api_key.or_else(|| self.remote.api_key.clone());

        if std::env::var("PODFLOW_SLOT_KEY").is_err() {
            config.slot_key = self.session.slot_key.clone();
        }
        if std::env::var("PODFLOW_TIMELINE_SECONDS").is_err() {
            if let Some(seconds) = self.session.timeline_seconds {
                config.timeline_seconds = seconds;
            }
        }
        config
    }

    pub fn default_stage(&self) -> Stage {
        self.session.default_stage.parse().unwrap_or(Stage::Blog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_round_trip() {
        let mut config = Config::default();
        config.set("remote.api_url", "http://localhost:8000").unwrap();
        config.set("session.default_stage", "metadata").unwrap();
        config.set("display.color", "false").unwrap();

        assert_eq!(
            config.get("remote.api_url").as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.default_stage(), Stage::Metadata);
        assert_eq!(config.get("display.color").as_deref(), Some("false"));

        config.set("remote.api_url", "").unwrap();
        assert!(config.get("remote.api_url").is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("remote.unknown", "x").is_err());
        assert!(config.set("session.default_stage", "transcript").is_err());
        assert!(config.set("session.timeline_seconds", "-5").is_err());
        assert!(config.set("session.slot_key", " ").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("session.default_episode", "ep-42").unwrap();
        config.set("session.timeline_seconds", "1800").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            Config::load_from(&dir.path().join("missing.toml")).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote]\napi_key = \"secret\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.remote.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.session.slot_key, "current_project");
        assert!(loaded.display.show_checks);
    }
}
