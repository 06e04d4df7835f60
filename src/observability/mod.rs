// src/observability/mod.rs
//! Logging, metrics, and the reporter collaborator
//!
//! [`init_tracing`] and [`init_metrics`] are meant for binaries; the library
//! itself only emits through `tracing` macros and injected [`Reporter`]s.

pub mod reporter;

pub use reporter::{ArchiveEvent, MemoryReporter, NullReporter, Reporter, TracingReporter};

use crate::utils::config::ObservabilityConfig;
use crate::utils::errors::{ArchiveError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ArchiveError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ArchiveError::ConfigError(format!("Failed to install subscriber: {}", e)))
}

/// Install the Prometheus exporter when `metrics_addr` is configured
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let Some(addr) = config.metrics_addr.as_deref() else {
        return Ok(());
    };

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| ArchiveError::ConfigError(format!("Invalid metrics address {}: {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ArchiveError::ConfigError(format!("Failed to install metrics exporter: {}", e)))?;

    info!("Prometheus metrics listening on {}", addr);
    Ok(())
}
