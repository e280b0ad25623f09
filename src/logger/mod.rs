//! Logger module
//!
//! Provides logging utilities for the file server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//!
//! Everything goes through `tracing`; the subscriber is installed once by
//! [`init`]. Access lines use the `access` target so they can be filtered
//! independently (`RUST_LOG=access=off`).

mod format;

pub use format::{AccessLogEntry, AccessLogFormat};

use crate::config::Config;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless, later calls are ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, config: &Config) {
    tracing::info!("======================================");
    tracing::info!("File server started");
    tracing::info!("Listening on: http://{addr}");
    tracing::info!("Serving: {}", root.display());
    let prefix = config.prefix();
    if !prefix.is_empty() {
        tracing::info!(
            "URL prefix: {prefix} ({})",
            config.routing.strategy.as_str()
        );
    }
    tracing::info!(
        "Cache: {} files, up to {} bytes each",
        config.cache.max_items,
        config.cache.max_size_bytes
    );
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    tracing::info!("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_info(message: &str) {
    tracing::info!("{message}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Startup failure, reported right before the process exits
pub fn log_fatal(err: &dyn Display) {
    tracing::error!("[FATAL] {err}");
}

pub fn log_prefix_mismatch(path: &str) {
    tracing::debug!("[Routing] '{path}' does not match the URL prefix");
}

pub fn log_cache_eviction(name: &str, reason: &str) {
    tracing::debug!("[Cache] Evicted '{name}': {reason}");
}

pub fn log_shutdown() {
    tracing::info!("Shutdown signal received, stopping server");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: AccessLogFormat) {
    tracing::info!(target: "access", "{}", entry.format(format));
}
