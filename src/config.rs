use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default generative-language endpoint
pub const DEFAULT_AI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    /// AI drafting configuration
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the SQLite file (default: data dir / store.db)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Enable the `draft` command
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Full `generateContent` URL, or a proxy that holds the API key
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_ai_endpoint(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ai_endpoint() -> String {
    DEFAULT_AI_ENDPOINT.to_string()
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("profmail");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .context("Could not find data directory")?
            .join("profmail");
        Ok(dir)
    }

    /// Where the key-value store lives
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("store.db")),
        }
    }

    /// Load the config file; a missing file means all defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = Self::config_dir()?;

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        fs::create_dir_all(Self::data_dir()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.ai.enabled);
        assert_eq!(config.ai.endpoint, DEFAULT_AI_ENDPOINT);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [storage]
            path = "/tmp/profmail-test.db"

            [ai]
            enabled = false
            endpoint = "https://proxy.example.com/draft"
        "#;

        let config = Config::parse(toml).unwrap();
        assert!(!config.ai.enabled);
        assert_eq!(config.ai.endpoint, "https://proxy.example.com/draft");
        assert_eq!(
            config.storage_path().unwrap(),
            PathBuf::from("/tmp/profmail-test.db")
        );
    }

    #[test]
    fn test_partial_ai_section() {
        let config = Config::parse("[ai]\nenabled = true\n").unwrap();
        assert_eq!(config.ai.endpoint, DEFAULT_AI_ENDPOINT);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.ai.endpoint, config.ai.endpoint);
    }
}
