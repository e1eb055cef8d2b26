//! Process-wide shutdown state.
//!
//! A `watch` channel carries a single "stopping" flag: the collector polls it
//! synchronously between sleep increments, the HTTP server awaits it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct Lifecycle {
    stopping: Arc<watch::Sender<bool>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            stopping: Arc::new(tx),
        }
    }

    pub fn is_running(&self) -> bool {
        !*self.stopping.borrow()
    }

    /// Flip to stopping. Only the first call has an effect and logs; it
    /// returns whether this call made the transition.
    pub fn request_shutdown(&self, reason: &str) -> bool {
        let flipped = self.stopping.send_if_modified(|stopping| {
            if *stopping {
                false
            } else {
                *stopping = true;
                true
            }
        });
        if flipped {
            info!("Shutdown signal received ({reason}). Cleaning up...");
        }
        flipped
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.stopping.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }

    /// Forward SIGINT/SIGTERM to `request_shutdown`. Runs until one arrives.
    pub async fn listen_for_signals(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => self.request_shutdown("SIGINT"),
                        _ = term.recv() => self.request_shutdown("SIGTERM"),
                    };
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                    self.request_shutdown("SIGINT");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            self.request_shutdown("ctrl-c");
        }
    }
}
