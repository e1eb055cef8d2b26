//! Turns raw probe readings into a `MetricRecord`.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::CollectionError;
use crate::probe::ResourceProbe;
use crate::types::{CpuMetrics, DiskMetrics, MemoryMetrics, MetricRecord};

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;

pub struct Sampler<P> {
    probe: P,
    cpu_window: Duration,
    disk_path: PathBuf,
}

impl<P: ResourceProbe> Sampler<P> {
    pub fn new(probe: P, cpu_window: Duration, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            probe,
            cpu_window,
            disk_path: disk_path.into(),
        }
    }

    /// Blocks for the CPU window. Capacities are floored to whole MB/GB.
    pub fn sample(&mut self) -> Result<MetricRecord, CollectionError> {
        let cpu = self.probe.cpu(self.cpu_window)?;
        let mem = self.probe.memory()?;
        let disk = self.probe.disk(&self.disk_path)?;

        let core_usage = cpu
            .per_core
            .iter()
            .map(|&v| percent("cpu core", v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetricRecord {
            timestamp: now_epoch_secs(),
            cpu: CpuMetrics {
                usage_percent: percent("cpu", cpu.usage_percent)?,
                core_usage,
                freq: if cpu.freq_mhz.is_finite() { cpu.freq_mhz.max(0.0) } else { 0.0 },
            },
            memory: MemoryMetrics {
                total_mb: mem.total / MB,
                available_mb: mem.available / MB,
                used_mb: mem.used / MB,
                percent: percent("memory", mem.percent)?,
            },
            disk: DiskMetrics {
                total_gb: disk.total / GB,
                used_gb: disk.used / GB,
                free_gb: disk.free / GB,
                percent: percent("disk", disk.percent)?,
            },
        })
    }
}

// NaN is a probe fault, not a reading.
fn percent(what: &str, v: f64) -> Result<f64, CollectionError> {
    if v.is_nan() {
        return Err(CollectionError::Probe(format!("{what} usage is not a number")));
    }
    Ok(v.clamp(0.0, 100.0))
}

fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
