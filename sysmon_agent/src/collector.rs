//! Collection loop: sample, publish, log, alert, then sleep in small steps so
//! a shutdown request is noticed quickly.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

use crate::alerts::AlertEvaluator;
use crate::error::CollectionError;
use crate::lifecycle::Lifecycle;
use crate::notify::AlertDispatcher;
use crate::probe::ResourceProbe;
use crate::sampler::Sampler;
use crate::state::SnapshotStore;
use crate::types::fmt_float;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    /// Pause between successful ticks.
    pub interval: Duration,
    /// Sleep granularity; upper bound on shutdown latency while idle.
    pub poll: Duration,
    /// Pause after a failed tick.
    pub backoff: Duration,
}

impl LoopTiming {
    pub fn every(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            poll: POLL_INTERVAL,
            backoff: FAILURE_BACKOFF,
        }
    }
}

pub struct Collector<P> {
    sampler: Sampler<P>,
    store: SnapshotStore,
    evaluator: AlertEvaluator,
    dispatcher: AlertDispatcher,
    lifecycle: Lifecycle,
    timing: LoopTiming,
}

impl<P: ResourceProbe> Collector<P> {
    pub fn new(
        sampler: Sampler<P>,
        store: SnapshotStore,
        evaluator: AlertEvaluator,
        dispatcher: AlertDispatcher,
        lifecycle: Lifecycle,
        timing: LoopTiming,
    ) -> Self {
        Self {
            sampler,
            store,
            evaluator,
            dispatcher,
            lifecycle,
            timing,
        }
    }

    /// One sample-publish-alert pass. On error nothing is published.
    pub fn tick(&mut self) -> Result<(), CollectionError> {
        let record = self.store.publish(self.sampler.sample()?);
        info!(
            "CPU: {}% | Mem: {}% | Disk: {}%",
            fmt_float(record.cpu.usage_percent),
            fmt_float(record.memory.percent),
            fmt_float(record.disk.percent)
        );
        for event in self.evaluator.evaluate(&record) {
            self.dispatcher.dispatch(&event);
        }
        Ok(())
    }

    pub fn run(mut self) {
        info!(
            "collector running every {}s",
            self.timing.interval.as_secs_f64()
        );
        while self.lifecycle.is_running() {
            let pause = match panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                Ok(Ok(())) => self.timing.interval,
                Ok(Err(e)) => {
                    error!("Metric collection failed: {e}");
                    self.timing.backoff
                }
                Err(payload) => {
                    error!("Unexpected error in main loop: {}", panic_message(&*payload));
                    self.timing.backoff
                }
            };
            if !self.sleep(pause) {
                break;
            }
        }
        info!("collector stopped");
    }

    // Returns false if shutdown was requested before `total` elapsed.
    fn sleep(&self, total: Duration) -> bool {
        let mut remaining = total;
        while !remaining.is_zero() {
            if !self.lifecycle.is_running() {
                return false;
            }
            let step = remaining.min(self.timing.poll);
            thread::sleep(step);
            remaining -= step;
        }
        self.lifecycle.is_running()
    }
}

/// Run the loop on its own OS thread so the blocking CPU window never lands on
/// the HTTP runtime.
pub fn spawn_collector<P>(collector: Collector<P>) -> io::Result<JoinHandle<()>>
where
    P: ResourceProbe + 'static,
{
    thread::Builder::new()
        .name("collector".into())
        .spawn(move || collector.run())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".into())
}
