//! Edge-triggered threshold alerts.
//!
//! Each rule is a two-state machine (below / above). Only the transition into
//! violation emits an event; staying above is silent, and dropping back to or
//! under the threshold re-arms the rule.

use crate::types::{fmt_float, MetricKind, MetricRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRule {
    pub metric: MetricKind,
    pub threshold: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertState {
    /// Record timestamp of the last emitted event.
    pub last_fired_at: Option<f64>,
    pub above: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub metric: &'static str,
    pub message: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
}

pub struct AlertEvaluator {
    rules: Vec<(AlertRule, AlertState)>,
}

impl AlertEvaluator {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|r| (r, AlertState::default()))
                .collect(),
        }
    }

    /// Run every enabled rule against `record`, in rule order.
    pub fn evaluate(&mut self, record: &MetricRecord) -> Vec<AlertEvent> {
        self.rules
            .iter_mut()
            .filter(|(rule, _)| rule.enabled)
            .filter_map(|(rule, state)| {
                step(rule, state, record.percent(rule.metric), record.timestamp)
            })
            .collect()
    }

    pub fn state(&self, metric: MetricKind) -> Option<AlertState> {
        self.rules
            .iter()
            .find(|(r, _)| r.metric == metric)
            .map(|(_, s)| *s)
    }
}

fn step(rule: &AlertRule, state: &mut AlertState, value: f64, at: f64) -> Option<AlertEvent> {
    let violating = value > rule.threshold;
    match (state.above, violating) {
        (false, true) => {
            state.above = true;
            state.last_fired_at = Some(at);
            Some(AlertEvent {
                metric: rule.metric.name(),
                message: message(rule.metric, value, rule.threshold),
                severity: Severity::Warning,
                value,
                threshold: rule.threshold,
            })
        }
        (true, false) => {
            state.above = false;
            None
        }
        _ => None,
    }
}

fn message(metric: MetricKind, value: f64, threshold: f64) -> String {
    let (v, t) = (fmt_float(value), fmt_float(threshold));
    match metric {
        MetricKind::Cpu => format!("HIGH CPU USAGE DETECTED: {v}% (Threshold: {t}%)"),
        MetricKind::Memory => format!("HIGH MEMORY USAGE DETECTED: {v}% (Threshold: {t}%)"),
        MetricKind::Disk => format!("LOW DISK SPACE: Usage is at {v}% (Threshold: {t}%)"),
    }
}
