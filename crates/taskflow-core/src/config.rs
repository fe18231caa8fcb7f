//! Configuration management for Taskflow.
//!
//! Loads configuration from ${TASKFLOW_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the API base URL.
pub const BASE_URL_ENV: &str = "TASKFLOW_API_BASE_URL";

/// Production backend.
pub const DEFAULT_BASE_URL: &str = "https://task-flow-backend-xp7s.onrender.com";

fn default_config_template() -> &'static str {
    r#"# Taskflow Configuration
#
# Location: $TASKFLOW_HOME/config.toml (default: ~/.config/taskflow/config.toml)

# API base URL (TASKFLOW_API_BASE_URL takes precedence when set)
# base_url = "https://task-flow-backend-xp7s.onrender.com"

# Per-request timeout in seconds (0 disables)
request_timeout_secs = 30
"#
}

pub mod paths {
    //! Path resolution for Taskflow configuration and credentials.
    //!
    //! TASKFLOW_HOME resolution order:
    //! 1. TASKFLOW_HOME environment variable (if set)
    //! 2. ~/.config/taskflow (default)

    use std::path::PathBuf;

    /// Returns the Taskflow home directory.
    pub fn taskflow_home() -> PathBuf {
        if let Ok(home) = std::env::var("TASKFLOW_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("taskflow")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        taskflow_home().join("config.toml")
    }

    /// Returns the path to the persisted credentials.
    pub fn credentials_path() -> PathBuf {
        taskflow_home().join("credentials.json")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API base URL (optional, falls back to the production backend)
    pub base_url: Option<String>,

    /// Timeout for each HTTP request in seconds (0 disables)
    pub request_timeout_secs: u64,
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        write_config(path, default_config_template())
    }

    /// Resolves the base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the selected URL does not parse.
    pub fn effective_base_url(&self) -> Result<String> {
        let from_env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(from_env.as_deref(), self.base_url.as_deref())
    }

    /// Request timeout, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn resolve_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    let chosen = [env_url, config_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty());

    match chosen {
        Some(url) => {
            url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
            Ok(url.trim_end_matches('/').to_string())
        }
        None => Ok(DEFAULT_BASE_URL.to_string()),
    }
}

/// Writes config content to a file, creating parent directories as needed.
/// Uses atomic write (temp file + rename) to prevent corruption.
fn write_config(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
