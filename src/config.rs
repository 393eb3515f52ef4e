use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::session::DEFAULT_PREFIX;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(skip)]
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Key taken from the environment; never written to the file
    #[serde(skip)]
    pub env_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_true")]
    pub auto_download: bool,
    #[serde(default = "default_display")]
    pub display: DisplayMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Terminal,
    None,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Terminal => "terminal",
            DisplayMode::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "terminal" => Some(DisplayMode::Terminal),
            "none" => Some(DisplayMode::None),
            _ => None,
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["terminal", "none"]
    }
}

// Default value functions
fn default_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_output_directory() -> String {
    "./lightstudio-output".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_display() -> DisplayMode {
    DisplayMode::Terminal
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: None,
            env_key: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            prefix: default_prefix(),
            auto_download: true,
            display: DisplayMode::Terminal,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            output: OutputConfig::default(),
            config_path: PathBuf::new(),
        }
    }
}

/// API key from the environment; `GEMINI_API_KEY` wins over `API_KEY`
pub fn env_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| !key.trim().is_empty())
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lightstudio", "lightstudio-cli")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file or create default
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let mut config = Self::from_toml(&content)?;
            config.config_path = config_path;
            config
        } else {
            let mut config = Config::default();
            config.config_path = config_path;
            config.save()?;
            config
        };

        // Environment variable takes precedence
        config.api.env_key = env_api_key();

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&self.config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// API key to use: the environment first, then the config file
    pub fn api_key(&self) -> Option<&str> {
        [self.api.env_key.as_deref(), self.api.key.as_deref()]
            .into_iter()
            .flatten()
            .find(|k| !k.trim().is_empty())
    }

    /// Set a config value by key path (e.g., "api.key", "output.prefix")
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.key" => self.api.key = Some(value.to_string()),
            "api.model" => self.api.model = value.to_string(),
            "api.base_url" => self.api.base_url = value.trim_end_matches('/').to_string(),
            "api.timeout_secs" => {
                self.api.timeout_secs = match value {
                    "" | "none" => None,
                    secs => Some(secs.parse().context("Invalid number of seconds")?),
                };
            }
            "output.directory" => self.output.directory = value.to_string(),
            "output.prefix" => {
                if value.is_empty() || value.contains(['/', '\\']) {
                    anyhow::bail!("Invalid prefix. It must be non-empty and contain no path separators");
                }
                self.output.prefix = value.to_string();
            }
            "output.auto_download" => {
                self.output.auto_download = value.parse()
                    .context("Invalid boolean value")?;
            }
            "output.display" => {
                self.output.display = DisplayMode::parse(value).with_context(|| {
                    format!("Invalid display mode. Valid values: {}", DisplayMode::variants().join(", "))
                })?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value by key path
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api.key" => self.api_key().map(|_| "****".to_string()), // Mask API key
            "api.model" => Some(self.api.model.clone()),
            "api.base_url" => Some(self.api.base_url.clone()),
            "api.timeout_secs" => Some(
                self.api
                    .timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ),
            "output.directory" => Some(self.output.directory.clone()),
            "output.prefix" => Some(self.output.prefix.clone()),
            "output.auto_download" => Some(self.output.auto_download.to_string()),
            "output.display" => Some(self.output.display.as_str().to_string()),
            _ => None,
        }
    }

    /// Get all config keys
    pub fn keys() -> &'static [&'static str] {
        &[
            "api.key",
            "api.model",
            "api.base_url",
            "api.timeout_secs",
            "output.directory",
            "output.prefix",
            "output.auto_download",
            "output.display",
        ]
    }

    /// Models known to return image output
    pub fn models() -> &'static [&'static str] {
        &["gemini-2.5-flash-image", "gemini-3-pro-image-preview"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api.model, "gemini-2.5-flash-image");
        assert_eq!(config.output.prefix, "archviz");
        assert_eq!(config.api.timeout_secs, None);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            key = "abc"

            [output]
            prefix = "villa"
            display = "none"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_key(), Some("abc"));
        assert_eq!(config.output.prefix, "villa");
        assert_eq!(config.output.display, DisplayMode::None);
        assert_eq!(config.output.directory, "./lightstudio-output");
    }

    #[test]
    fn set_and_get_by_key() {
        let mut config = Config::default();

        config.set("api.key", "secret").unwrap();
        config.set("api.timeout_secs", "90").unwrap();
        config.set("output.prefix", "tower").unwrap();
        config.set("api.base_url", "http://localhost:8080/").unwrap();

        assert_eq!(config.get("api.key").as_deref(), Some("****"));
        assert_eq!(config.get("api.timeout_secs").as_deref(), Some("90"));
        assert_eq!(config.get("output.prefix").as_deref(), Some("tower"));
        assert_eq!(config.api.base_url, "http://localhost:8080");

        config.set("api.timeout_secs", "none").unwrap();
        assert_eq!(config.api.timeout_secs, None);
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("output.display", "viewer").is_err());
        assert!(config.set("output.prefix", "a/b").is_err());
        assert!(config.set("output.auto_download", "maybe").is_err());
        assert!(config.set("nope", "x").is_err());
        assert!(Config::keys().iter().all(|k| config.get(k).is_some() || *k == "api.key"));
    }

    #[test]
    fn env_key_wins_but_is_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.config_path = dir.path().join("config.toml");
        config.api.key = Some("file-key".to_string());
        config.api.env_key = Some("env-secret-123".to_string());

        assert_eq!(config.api_key(), Some("env-secret-123"));
        config.set("output.prefix", "villa").unwrap();
        config.save().unwrap();

        let written = fs::read_to_string(&config.config_path).unwrap();
        assert!(!written.contains("env-secret-123"));
        let reloaded = Config::from_toml(&written).unwrap();
        assert_eq!(reloaded.api_key(), Some("file-key"));
        assert_eq!(reloaded.output.prefix, "villa");
    }

    #[test]
    fn env_key_alone_is_masked_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.config_path = dir.path().join("config.toml");
        config.api.env_key = Some("env-only".to_string());

        assert_eq!(config.get("api.key").as_deref(), Some("****"));
        config.save().unwrap();

        let reloaded = Config::from_toml(&fs::read_to_string(&config.config_path).unwrap()).unwrap();
        assert!(reloaded.api_key().is_none());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut config = Config::default();
        config.api.key = Some("   ".to_string());
        assert!(config.api_key().is_none());
    }
}
