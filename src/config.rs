use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poller: PollerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Dashboard poll interval in seconds
    #[serde(default = "default_dashboard_refresh_secs")]
    pub dashboard_refresh_secs: u64,
}

impl ServerConfig {
    /// Dashboard poll interval in seconds, never below 1.
    pub fn refresh_secs(&self) -> u64 {
        self.dashboard_refresh_secs.max(1)
    }

    pub fn dashboard_refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: default_database_url(),
            dashboard_refresh_secs: default_dashboard_refresh_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    /// Pause between feed cycles in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Trailing window in minutes; older feed items are ignored
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
    /// Timeout applied to every outbound request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            window_minutes: default_window_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            anthropic_base_url: default_anthropic_base_url(),
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_url() -> String {
    "sqlite:news.db?mode=rwc".to_string()
}

fn default_dashboard_refresh_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_window_minutes() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_model() -> String {
    "claude-3-5-sonnet-20240620".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Path of the TOML file, `SIGNALS_CONFIG` or `signals.toml`.
    pub fn path_from_env() -> String {
        std::env::var("SIGNALS_CONFIG").unwrap_or_else(|_| "signals.toml".to_string())
    }
}

/// Secrets and endpoints the service reads from the environment.
#[derive(Debug, Clone)]
pub struct ServiceEnv {
    pub api_key: String,
    pub database_url: Option<String>,
}

impl ServiceEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: require(&lookup, "API_KEY")?,
            database_url: optional(&lookup, "DATABASE_URL"),
        })
    }
}

/// Overrides the dashboard viewer reads from the environment.
#[derive(Debug, Clone)]
pub struct DashboardEnv {
    pub database_url: Option<String>,
}

impl DashboardEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database_url: optional(&lookup, "DATABASE_URL"),
        }
    }
}

/// Secrets and endpoints the poller reads from the environment.
#[derive(Debug, Clone)]
pub struct PollerEnv {
    pub feed_url: String,
    pub feed_base_url: String,
    pub api_endpoint: String,
    pub api_key: String,
    pub anthropic_api_key: String,
}

impl PollerEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            feed_url: require(&lookup, "FEED_URL")?,
            feed_base_url: require(&lookup, "FEED_BASE_URL")?,
            api_endpoint: require(&lookup, "API_ENDPOINT")?,
            api_key: require(&lookup, "API_KEY")?,
            anthropic_api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
        })
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
