//! Collection loop behavior against a scripted probe.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sysmon_agent::alerts::{AlertEvaluator, AlertEvent, AlertRule};
use sysmon_agent::collector::{spawn_collector, Collector, LoopTiming};
use sysmon_agent::error::{CollectionError, NotificationError};
use sysmon_agent::lifecycle::Lifecycle;
use sysmon_agent::notify::{AlertDispatcher, AlertSink};
use sysmon_agent::probe::{RawCpu, RawDisk, RawMemory, ResourceProbe};
use sysmon_agent::sampler::Sampler;
use sysmon_agent::state::SnapshotStore;
use sysmon_agent::types::MetricKind;

const GB: u64 = 1024 * 1024 * 1024;

#[derive(Clone, Copy)]
enum Step {
    Cpu(f64),
    Fail,
    Panic,
}

/// Plays back `steps`, then keeps reporting 10% CPU.
struct Scripted {
    steps: VecDeque<Step>,
}

impl Scripted {
    fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
        }
    }
}

impl ResourceProbe for Scripted {
    fn cpu(&mut self, _window: Duration) -> Result<RawCpu, CollectionError> {
        match self.steps.pop_front().unwrap_or(Step::Cpu(10.0)) {
            Step::Cpu(v) => Ok(RawCpu {
                usage_percent: v,
                per_core: vec![v, v],
                freq_mhz: 3000.0,
            }),
            Step::Fail => Err(CollectionError::Probe("scripted failure".into())),
            Step::Panic => panic!("scripted panic"),
        }
    }

    fn memory(&mut self) -> Result<RawMemory, CollectionError> {
        Ok(RawMemory {
            total: 8 * GB,
            available: 4 * GB,
            used: 4 * GB,
            percent: 50.0,
        })
    }

    fn disk(&mut self, _mount_point: &Path) -> Result<RawDisk, CollectionError> {
        Ok(RawDisk {
            total: 100 * GB,
            used: 20 * GB,
            free: 80 * GB,
            percent: 20.0,
        })
    }
}

struct Recording(Arc<Mutex<Vec<String>>>);

impl AlertSink for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        self.0.lock().unwrap().push(event.message.clone());
        Ok(())
    }
}

struct Harness {
    store: SnapshotStore,
    lifecycle: Lifecycle,
    alerts: Arc<Mutex<Vec<String>>>,
}

fn build(steps: &[Step], timing: LoopTiming) -> (Collector<Scripted>, Harness) {
    let store = SnapshotStore::new();
    let lifecycle = Lifecycle::new();
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let collector = Collector::new(
        Sampler::new(Scripted::new(steps), Duration::ZERO, "/"),
        store.clone(),
        AlertEvaluator::new(vec![AlertRule {
            metric: MetricKind::Cpu,
            threshold: 80.0,
            enabled: true,
        }]),
        AlertDispatcher::new(vec![Box::new(Recording(alerts.clone()))]),
        lifecycle.clone(),
        timing,
    );
    (
        collector,
        Harness {
            store,
            lifecycle,
            alerts,
        },
    )
}

fn fast() -> LoopTiming {
    LoopTiming {
        interval: Duration::from_millis(10),
        poll: Duration::from_millis(5),
        backoff: Duration::from_millis(10),
    }
}

fn wait_until(timeout: Duration, mut ok: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if ok() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    ok()
}

#[test]
fn failed_tick_leaves_previous_snapshot() {
    let (mut c, h) = build(&[Step::Cpu(42.5), Step::Fail], fast());
    c.tick().unwrap();
    let before = h.store.read().unwrap();
    assert_eq!(before.cpu.usage_percent, 42.5);

    assert!(c.tick().is_err());
    let after = h.store.read().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn alerts_fire_on_crossings_only() {
    let steps: Vec<Step> = [70.0, 85.0, 90.0, 75.0, 95.0]
        .into_iter()
        .map(Step::Cpu)
        .collect();
    let (mut c, h) = build(&steps, fast());
    for _ in 0..steps.len() {
        c.tick().unwrap();
    }
    let alerts = h.alerts.lock().unwrap();
    assert_eq!(
        *alerts,
        vec![
            "HIGH CPU USAGE DETECTED: 85.0% (Threshold: 80.0%)".to_string(),
            "HIGH CPU USAGE DETECTED: 95.0% (Threshold: 80.0%)".to_string(),
        ]
    );
}

#[test]
fn shutdown_interrupts_a_long_interval() {
    let timing = LoopTiming {
        interval: Duration::from_secs(60),
        poll: Duration::from_millis(20),
        backoff: Duration::from_secs(60),
    };
    let (c, h) = build(&[], timing);
    let handle = spawn_collector(c).unwrap();
    assert!(wait_until(Duration::from_secs(2), || h.store.read().is_some()));

    let asked = Instant::now();
    assert!(h.lifecycle.request_shutdown("test"));
    handle.join().unwrap();
    assert!(
        asked.elapsed() < Duration::from_millis(500),
        "took {:?}",
        asked.elapsed()
    );
}

#[test]
fn shutdown_interrupts_backoff() {
    let timing = LoopTiming {
        interval: Duration::from_secs(60),
        poll: Duration::from_millis(20),
        backoff: Duration::from_secs(60),
    };
    let (c, h) = build(&[Step::Fail], timing);
    let handle = spawn_collector(c).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(h.store.read().is_none());

    let asked = Instant::now();
    h.lifecycle.request_shutdown("test");
    handle.join().unwrap();
    assert!(asked.elapsed() < Duration::from_millis(500));
}

#[test]
fn loop_survives_panics_and_failures() {
    let (c, h) = build(&[Step::Panic, Step::Fail, Step::Cpu(33.0)], fast());
    let handle = spawn_collector(c).unwrap();
    assert!(wait_until(Duration::from_secs(3), || {
        h.store
            .read()
            .is_some_and(|r| r.cpu.usage_percent == 33.0 || r.cpu.usage_percent == 10.0)
    }));
    h.lifecycle.request_shutdown("test");
    handle.join().expect("collector thread must not die on a panicking tick");
}

#[test]
fn stopped_before_start_never_samples() {
    let (c, h) = build(&[Step::Cpu(99.0)], fast());
    h.lifecycle.request_shutdown("test");
    spawn_collector(c).unwrap().join().unwrap();
    assert!(h.store.read().is_none());
    assert!(h.alerts.lock().unwrap().is_empty());
}
