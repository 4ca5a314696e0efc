use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::activity::DEFAULT_CAPACITY;

/// Settings shared by both services.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, log lines are also appended to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub capacity: usize,
    pub simulate: bool,
    pub simulate_interval_secs: u64,
    pub track_requests: bool,
    pub logging: LoggingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            capacity: DEFAULT_CAPACITY,
            simulate: true,
            simulate_interval_secs: 15,
            track_requests: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    pub tracker_host: String,
    pub tracker_port: u16,
    pub poll_interval_ms: u64,
    pub startup_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_limit: usize,
    pub db_path: PathBuf,
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tracker_host: "127.0.0.1".to_string(),
            tracker_port: 3000,
            poll_interval_ms: 5000,
            startup_delay_ms: 2000,
            request_timeout_ms: 5000,
            poll_limit: 100,
            db_path: default_db_path(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
        .join("board.db")
}

impl TrackerConfig {
    pub fn simulate_interval(&self) -> Duration {
        Duration::from_secs(self.simulate_interval_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = parse_env("PORT", &port)?;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = env;
        }
        if let Some(flag) = lookup("SIMULATE_ACTIVITY") {
            self.simulate = parse_bool("SIMULATE_ACTIVITY", &flag)?;
        }
        if let Some(flag) = lookup("TRACK_REQUESTS") {
            self.track_requests = parse_bool("TRACK_REQUESTS", &flag)?;
        }
        self.logging.apply_env(&lookup);
        Ok(())
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn tracker_url(&self) -> String {
        format!("http://{}:{}", self.tracker_host, self.tracker_port)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = parse_env("PORT", &port)?;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(host) = lookup("TRACKER_HOST") {
            self.tracker_host = host;
        }
        if let Some(port) = lookup("TRACKER_PORT") {
            self.tracker_port = parse_env("TRACKER_PORT", &port)?;
        }
        if let Some(interval) = lookup("MONITOR_INTERVAL") {
            self.poll_interval_ms = parse_env("MONITOR_INTERVAL", &interval)?;
        }
        if let Some(path) = lookup("DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        self.logging.apply_env(&lookup);
        Ok(())
    }
}

impl LoggingConfig {
    fn apply_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.level = level;
        }
        if let Some(path) = lookup("ACTIVITY_LOG_PATH") {
            self.file = Some(PathBuf::from(path));
        }
    }
}

/// Read a TOML config file. A missing `path` yields the defaults.
pub fn load_file<T>(path: Option<&Path>) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid {}={:?}: expected a boolean", key, raw),
    }
}
