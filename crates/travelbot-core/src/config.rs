use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the configured endpoint URL.
pub const API_URL_ENV: &str = "TRAVELBOT_API_URL";

pub const DEFAULT_PERSONA: &str = "You are TravelAI, a professional Sri Lankan travel consultant. \
Please provide expert guidance on travel, destinations, transportation, and accommodations. \
For non-travel queries, respond with 'I specialize in travel-related inquiries only.'";

pub const DEFAULT_THINKING_DELAY_MS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("no completion endpoint configured; set TRAVELBOT_API_URL or api_url in {0}")]
    MissingApiUrl(String),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What the session does with the "thinking" placeholder when a request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Swap the placeholder for a visible notice turn.
    #[default]
    ReplaceWithNotice,
    /// Drop the placeholder.
    RemovePlaceholder,
    /// Leave the placeholder where it is.
    KeepPlaceholder,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub persona: Option<String>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub thinking_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: None,
            persona: Some(DEFAULT_PERSONA.to_string()),
            failure_policy: FailurePolicy::default(),
            thinking_delay_ms: Some(DEFAULT_THINKING_DELAY_MS),
            request_timeout_secs: None,
        }
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Endpoint URL - env var first, then config.
    pub fn resolve_api_url(&self) -> Result<String, ConfigError> {
        Self::pick_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    fn pick_api_url(env: Option<String>, configured: Option<&str>) -> Result<String, ConfigError> {
        env.filter(|url| !url.trim().is_empty())
            .or_else(|| configured.map(str::to_string))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                let location = Self::get_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.json".to_string());
                ConfigError::MissingApiUrl(location)
            })
    }

    pub fn persona(&self) -> &str {
        self.persona.as_deref().unwrap_or(DEFAULT_PERSONA)
    }

    pub fn thinking_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.thinking_delay_ms.unwrap_or(DEFAULT_THINKING_DELAY_MS))
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs.map(std::time::Duration::from_secs)
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("travelbot"))
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
