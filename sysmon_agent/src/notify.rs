//! Alert delivery. Every event is logged at WARN; configured sinks get it
//! afterwards and their failures are logged, never propagated.

use tracing::{debug, error, warn};

use crate::alerts::AlertEvent;
use crate::config::AlertsConfig;
use crate::error::NotificationError;

pub trait AlertSink: Send {
    fn name(&self) -> &'static str;
    fn deliver(&self, event: &AlertEvent) -> Result<(), NotificationError>;
}

/// Red `[ALERT]` line on stdout for people watching the terminal.
pub struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn deliver(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        println!("\x1b[91m[ALERT] {}\x1b[0m", event.message);
        Ok(())
    }
}

pub const SLACK_WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";

/// Slack handoff. The webhook comes from the environment, never the config
/// file; the HTTP post itself is left to whatever consumes the payload.
pub struct SlackSink {
    webhook: Option<String>,
}

impl SlackSink {
    pub fn from_env() -> Self {
        Self::new(std::env::var(SLACK_WEBHOOK_ENV).ok().filter(|v| !v.is_empty()))
    }

    pub fn new(webhook: Option<String>) -> Self {
        Self { webhook }
    }

    pub fn payload(event: &AlertEvent) -> serde_json::Value {
        serde_json::json!({ "text": event.message })
    }
}

impl AlertSink for SlackSink {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn deliver(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let Some(_url) = self.webhook.as_deref() else {
            return Err(NotificationError::MissingWebhook);
        };
        debug!(payload = %Self::payload(event), "slack alert handed off");
        Ok(())
    }
}

pub struct AlertDispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn from_config(cfg: &AlertsConfig) -> Self {
        let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
        if cfg.enable_console {
            sinks.push(Box::new(ConsoleSink));
        }
        if cfg.enable_slack {
            sinks.push(Box::new(SlackSink::from_env()));
        }
        Self::new(sinks)
    }

    /// Returns how many sink deliveries failed.
    pub fn dispatch(&self, event: &AlertEvent) -> usize {
        warn!("{}", event.message);
        let mut failed = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event) {
                error!(sink = sink.name(), "{e}");
                failed += 1;
            }
        }
        failed
    }
}
