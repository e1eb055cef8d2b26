//! Metric record served over HTTP.
//! Keep this module minimal and stable; it defines the wire format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CpuMetrics {
    pub usage_percent: f64,
    pub core_usage: Vec<f64>,
    // MHz; 0 when the host does not report a frequency
    pub freq: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryMetrics {
    pub total_mb: u64,
    pub available_mb: u64,
    pub used_mb: u64,
    pub percent: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiskMetrics {
    pub total_gb: u64,
    pub used_gb: u64,
    pub free_gb: u64,
    pub percent: f64,
}

/// One tick's worth of host metrics. Produced by the sampler, never mutated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
}

/// The metrics alert rules are defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::Disk];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
        }
    }
}

impl MetricRecord {
    /// The headline percentage for `kind`.
    pub fn percent(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu.usage_percent,
            MetricKind::Memory => self.memory.percent,
            MetricKind::Disk => self.disk.percent,
        }
    }
}

/// Render a float the way the agent's text outputs always have: integral
/// values keep one decimal (`60.0`), others print in shortest form (`42.5`).
pub fn fmt_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
