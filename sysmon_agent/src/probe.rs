//! Host resource probes. `ResourceProbe` is the seam between the sampler and
//! the OS; `SysinfoProbe` is the real one.

use std::path::Path;
use std::time::Duration;
#[cfg(not(unix))]
use sysinfo::Disks;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::error::CollectionError;

#[derive(Debug, Clone, PartialEq)]
pub struct RawCpu {
    pub usage_percent: f64,
    pub per_core: Vec<f64>,
    pub freq_mhz: f64,
}

/// Byte counts plus the usage percentage as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
}

/// `free` is the space an unprivileged user can still allocate; blocks
/// reserved for root count as neither used nor free.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDisk {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

impl RawDisk {
    /// Derive usage from `statvfs`-style block counts. The percentage is
    /// taken against `used + available`, the capacity a user can reach.
    pub fn from_blocks(frsize: u64, blocks: u64, bfree: u64, bavail: u64) -> Self {
        let total = blocks.saturating_mul(frsize);
        let used = total.saturating_sub(bfree.saturating_mul(frsize));
        let free = bavail.saturating_mul(frsize);
        let reachable = used.saturating_add(free);
        let percent = if reachable == 0 {
            0.0
        } else {
            round1(used as f64 / reachable as f64 * 100.0)
        };
        Self {
            total,
            used,
            free,
            percent,
        }
    }
}

pub trait ResourceProbe: Send {
    /// Blocks for `window` to measure utilization.
    fn cpu(&mut self, window: Duration) -> Result<RawCpu, CollectionError>;
    fn memory(&mut self) -> Result<RawMemory, CollectionError>;
    fn disk(&mut self, mount_point: &Path) -> Result<RawDisk, CollectionError>;
}

pub struct SysinfoProbe {
    sys: System,
    #[cfg(not(unix))]
    disks: Disks,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        Self {
            sys: System::new_with_specifics(refresh_kind),
            #[cfg(not(unix))]
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn cpu(&mut self, window: Duration) -> Result<RawCpu, CollectionError> {
        // Usage is a delta between two refreshes, so both aggregate and
        // per-core figures come out of this one window.
        self.sys.refresh_cpu_usage();
        std::thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        self.sys.refresh_cpu_usage();
        self.sys.refresh_cpu_frequency();

        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(CollectionError::NoCpus);
        }
        let per_core: Vec<f64> = cpus.iter().map(|c| round1(c.cpu_usage() as f64)).collect();
        let freq_mhz = mean_mhz(cpus.iter().map(|c| c.frequency()));
        Ok(RawCpu {
            usage_percent: round1(self.sys.global_cpu_usage() as f64),
            per_core,
            freq_mhz,
        })
    }

    fn memory(&mut self) -> Result<RawMemory, CollectionError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(CollectionError::MemoryUnavailable);
        }
        let available = self.sys.available_memory();
        Ok(RawMemory {
            total,
            available,
            used: self.sys.used_memory(),
            percent: round1(total.saturating_sub(available) as f64 / total as f64 * 100.0),
        })
    }

    #[cfg(unix)]
    fn disk(&mut self, mount_point: &Path) -> Result<RawDisk, CollectionError> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(mount_point.as_os_str().as_bytes())
            .map_err(|_| CollectionError::DiskNotFound(mount_point.to_path_buf()))?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            return Err(match err.kind() {
                std::io::ErrorKind::NotFound => {
                    CollectionError::DiskNotFound(mount_point.to_path_buf())
                }
                _ => CollectionError::Probe(format!(
                    "statvfs {} failed: {err}",
                    mount_point.display()
                )),
            });
        }
        Ok(RawDisk::from_blocks(
            stat.f_frsize as u64,
            stat.f_blocks as u64,
            stat.f_bfree as u64,
            stat.f_bavail as u64,
        ))
    }

    // No reserved-block count here, so available space stands in for free.
    #[cfg(not(unix))]
    fn disk(&mut self, mount_point: &Path) -> Result<RawDisk, CollectionError> {
        self.disks.refresh(true);
        let disk = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == mount_point)
            .ok_or_else(|| CollectionError::DiskNotFound(mount_point.to_path_buf()))?;
        Ok(RawDisk::from_blocks(
            1,
            disk.total_space(),
            disk.available_space(),
            disk.available_space(),
        ))
    }
}

/// Average frequency across cores; 0 for an empty set.
fn mean_mhz(freqs: impl Iterator<Item = u64>) -> f64 {
    let (sum, n) = freqs.fold((0u64, 0u64), |(s, n), f| (s.saturating_add(f), n + 1));
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

#[inline]
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
