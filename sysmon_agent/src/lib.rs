//! Host metrics agent: a background collector samples CPU, memory and disk,
//! raises edge-triggered threshold alerts, and publishes the latest snapshot
//! for an HTTP server to expose as JSON and Prometheus text.

pub mod alerts;
pub mod api;
pub mod args;
pub mod collector;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod sampler;
pub mod state;
pub mod types;
