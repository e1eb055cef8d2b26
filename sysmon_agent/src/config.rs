//! YAML configuration for the agent.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::alerts::AlertRule;
use crate::error::ConfigurationError;
use crate::types::MetricKind;

/// The CPU window sleep cannot be interrupted, so it bounds shutdown latency.
pub const MAX_CPU_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub system: SystemConfig,
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Seconds between ticks.
    pub update_interval: u64,
    pub log_location: PathBuf,
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,
    #[serde(default = "default_cpu_window_ms")]
    pub cpu_window_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    #[serde(default)]
    pub enable_slack: bool,
    #[serde(default = "yes")]
    pub enable_console: bool,
    #[serde(default = "yes")]
    pub cpu_enabled: bool,
    #[serde(default = "yes")]
    pub memory_enabled: bool,
    #[serde(default = "yes")]
    pub disk_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub max_bytes: u64,
    pub backup_count: usize,
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}
fn default_cpu_window_ms() -> u64 {
    1000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_level() -> String {
    "info".into()
}
fn yes() -> bool {
    true
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigurationError> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigurationError> {
        let cfg: AgentConfig =
            serde_yaml::from_str(text).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.system.update_interval == 0 {
            return Err(ConfigurationError::Invalid(
                "system.update_interval must be at least 1 second".into(),
            ));
        }
        if self.system.cpu_window_ms == 0 || self.system.cpu_window_ms > MAX_CPU_WINDOW_MS {
            return Err(ConfigurationError::Invalid(format!(
                "system.cpu_window_ms must be between 1 and {MAX_CPU_WINDOW_MS}"
            )));
        }
        for (key, v) in [
            ("alerts.cpu_threshold", self.alerts.cpu_threshold),
            ("alerts.memory_threshold", self.alerts.memory_threshold),
            ("alerts.disk_threshold", self.alerts.disk_threshold),
        ] {
            if !v.is_finite() {
                return Err(ConfigurationError::Invalid(format!("{key} must be a number")));
            }
        }
        Ok(())
    }

    /// One rule per monitored metric, in cpu/memory/disk order.
    pub fn alert_rules(&self) -> Vec<AlertRule> {
        let a = &self.alerts;
        MetricKind::ALL
            .into_iter()
            .map(|metric| {
                let (threshold, enabled) = match metric {
                    MetricKind::Cpu => (a.cpu_threshold, a.cpu_enabled),
                    MetricKind::Memory => (a.memory_threshold, a.memory_enabled),
                    MetricKind::Disk => (a.disk_threshold, a.disk_enabled),
                };
                AlertRule {
                    metric,
                    threshold,
                    enabled,
                }
            })
            .collect()
    }
}
