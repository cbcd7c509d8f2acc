use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local development address of the chat endpoint
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/chat";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const API_URL_ENV: &str = "SAGE_API_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "SAGE_REQUEST_TIMEOUT_SECS";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat endpoint every request is sent to
    pub api_url: String,

    /// Maximum wait for the response and between streamed chunks
    pub request_timeout_secs: u64,

    /// Sage home directory (~/.sage)
    #[serde(skip)]
    pub sage_home: PathBuf,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            tick_rate_ms: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sage_home: home.join(".sage"),
            ui: UiConfig::default(),
        }
    }
}

/// Values given on the command line, highest precedence
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration: defaults, then ~/.sage/config.toml, then environment, then CLI
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".sage"), |key| std::env::var(key).ok(), overrides)
    }

    /// Load with an explicit home directory and environment lookup
    pub fn load_from<F>(sage_home: &Path, env: F, overrides: &ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = sage_home.join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.sage_home = sage_home.to_path_buf();

        config.apply_env(env)?;
        config.apply_overrides(overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }

        if let Some(raw) = env(REQUEST_TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            self.request_timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got '{}'", REQUEST_TIMEOUT_ENV, raw))?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.api_url {
            self.api_url = url.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid chat endpoint URL '{}'", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Chat endpoint URL must use http or https, got '{}'", url.scheme());
        }
        if self.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        if self.ui.tick_rate_ms == 0 {
            bail!("UI tick rate must be at least one millisecond");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms)
    }

    /// Directory log files are written to
    pub fn log_dir(&self) -> PathBuf {
        self.sage_home.join("logs")
    }
}
