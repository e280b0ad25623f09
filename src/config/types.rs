// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use crate::logger::AccessLogFormat;
use crate::routing::MatchStrategy;

/// Main configuration structure, built once at startup and never mutated
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub routing: RoutingConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory to serve, relative paths are resolved at startup
    pub root: String,
    /// Chroot into `root` before serving
    pub chroot: bool,
    /// Account to switch to after startup, empty means stay as is
    #[serde(default)]
    pub user: Option<String>,
    pub workers: Option<usize>,
    pub max_connections: Option<u64>,
    /// Per-connection timeout in seconds, 0 disables it
    pub request_timeout: u64,
    pub keep_alive: bool,
}

impl ServerConfig {
    pub fn run_as(&self) -> Option<&str> {
        self.user.as_deref().filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum seconds between accesses a file may stay cached, 0 = forever
    pub expire_seconds: u64,
    /// Seconds between cache sweeps, 0 disables sweeping
    pub garbage_interval_seconds: u64,
    /// Maximum number of cached files
    pub max_items: u64,
    /// Largest file size that will be cached
    pub max_size_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// URL prefix stripped before lookup, empty disables rewriting
    pub url_prefix: String,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    /// Duration such as `30s` or `1m30s`, empty disables the reporter
    pub dump_interval: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub access_log_format: AccessLogFormat,
}
