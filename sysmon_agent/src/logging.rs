//! Logging setup: stdout plus a size-rotated file, both fed by `tracing`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AgentConfig;

/// Overrides `logging.level` when set, e.g. `SYSMON_AGENT_LOG=debug`.
pub const LOG_ENV: &str = "SYSMON_AGENT_LOG";

pub fn init_logging(cfg: &AgentConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&cfg.logging.level)?,
    };
    let file = RotatingFile::open(
        &cfg.system.log_location,
        cfg.logging.max_bytes,
        cfg.logging.backup_count,
    )?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file),
        )
        .try_init()?;
    Ok(())
}

/// Append-only log file that rolls over by size.
///
/// Before a write that would take the file to `max_bytes` or beyond, the file
/// becomes `<name>.1`, `<name>.1` becomes `<name>.2` and so on, keeping at
/// most `backup_count` backups. Either limit set to 0 disables rotation.
pub struct RotatingFile {
    inner: Mutex<Inner>,
}

struct Inner {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backup_count: usize,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = open_append(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(Inner {
                path: path.to_path_buf(),
                file,
                size,
                max_bytes,
                backup_count,
            }),
        })
    }
}

impl Inner {
    fn should_roll(&self, incoming: usize) -> bool {
        self.max_bytes > 0
            && self.backup_count > 0
            && self.size > 0
            && self.size + incoming as u64 >= self.max_bytes
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for i in (1..self.backup_count).rev() {
            let src = backup_path(&self.path, i);
            if src.exists() {
                rename_over(&src, &backup_path(&self.path, i + 1))?;
            }
        }
        rename_over(&self.path, &backup_path(&self.path, 1))?;
        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }

    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_roll(buf.len()) {
            self.roll()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }
}

pub fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn rename_over(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    fs::rename(from, to)
}

pub struct RotatingWriter<'a> {
    inner: &'a Mutex<Inner>,
}

impl Write for RotatingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriter { inner: &self.inner }
    }
}
