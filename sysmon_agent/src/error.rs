//! Error taxonomy for the agent. Only `ConfigurationError` is fatal; the rest
//! are recovered where they occur.

use std::path::PathBuf;
use thiserror::Error;

/// A sampling attempt could not be completed. The tick is skipped and the
/// loop backs off; the value is never coerced to zero.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("no CPUs reported by the host")]
    NoCpus,
    #[error("memory totals unavailable")]
    MemoryUnavailable,
    #[error("no disk mounted at {0}")]
    DiskNotFound(PathBuf),
    #[error("probe failed: {0}")]
    Probe(String),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("config file '{path}' could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file '{path}' is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Optional downstream alert delivery failed. Logged, never propagated.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Slack enabled but SLACK_WEBHOOK_URL not set.")]
    MissingWebhook,
    #[error("{sink} delivery failed: {reason}")]
    Delivery { sink: &'static str, reason: String },
}

/// No snapshot has been published yet.
#[derive(Debug, Error)]
#[error("Collector not initialized")]
pub struct ExposureNotReady;
