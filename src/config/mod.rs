// Configuration module entry point
// Command line parsing and layered configuration loading

mod duration;
mod state;
mod types;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::BootstrapError;
use crate::routing::{MatchStrategy, PathMatcher, Prefix};

// Re-export public types
pub use duration::parse_duration;
pub use state::AppState;
pub use types::{CacheConfig, Config};

/// Default per-file size limit for caching (16 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 16 * 1024 * 1024;

/// Serve a directory through an in-memory file cache
#[derive(Debug, Parser)]
#[command(name = "cached_fileserver", version, about)]
pub struct Cli {
    /// Directory to serve [default: .]
    pub root: Option<PathBuf>,

    /// Configuration file, extension optional
    #[arg(short = 'c', long = "config", default_value = "config")]
    pub config_file: String,

    /// Maximum number of seconds between accesses a file can stay in the cache (0 = forever)
    #[arg(short = 'e', long = "expire")]
    pub expire: Option<u64>,

    /// Scan the cache for expired items every <n> seconds
    #[arg(short = 'g', long = "garbage")]
    pub garbage: Option<u64>,

    /// Max number of files to store in the cache
    #[arg(short = 'n', long = "max-items")]
    pub max_items: Option<u64>,

    /// Max file size to cache, in bytes
    #[arg(short = 's', long = "max-size")]
    pub max_size: Option<u64>,

    /// Port to listen on
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Chroot to the served directory
    #[arg(short = 'r', long = "chroot")]
    pub chroot: bool,

    /// User to run as
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// URL prefix to strip from request paths
    #[arg(short = 'f', long = "prefix")]
    pub prefix: Option<String>,

    /// Dump cache stats at this interval (e.g. 30s, 1m30s); off when empty
    #[arg(short = 'd', long = "dump")]
    pub dump: Option<String>,

    /// Prefix matching strategy
    #[arg(short = 'm', long = "match", value_enum)]
    pub strategy: Option<MatchStrategy>,
}

impl Config {
    /// Load configuration with precedence: CLI flags > environment
    /// (`FILESERVER_SECTION__KEY`) > config file > built-in defaults
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&cli.config_file).required(false))
            .add_source(
                config::Environment::with_prefix("FILESERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.root", ".")?
            .set_default("server.chroot", false)?
            .set_default("server.request_timeout", 30)?
            .set_default("server.keep_alive", true)?
            .set_default("cache.expire_seconds", 0)?
            .set_default("cache.garbage_interval_seconds", 60)?
            .set_default("cache.max_items", 100)?
            .set_default("cache.max_size_bytes", DEFAULT_MAX_SIZE)?
            .set_default("routing.url_prefix", "")?
            .set_default("routing.strategy", MatchStrategy::Exact.as_str())?
            .set_default("stats.dump_interval", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_override_option(
                "server.root",
                cli.root.as_ref().map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("server.port", cli.port.map(u64::from))?
            .set_override_option("server.chroot", cli.chroot.then_some(true))?
            .set_override_option("server.user", cli.user.clone())?
            .set_override_option("cache.expire_seconds", cli.expire)?
            .set_override_option("cache.garbage_interval_seconds", cli.garbage)?
            .set_override_option("cache.max_items", cli.max_items)?
            .set_override_option("cache.max_size_bytes", cli.max_size)?
            .set_override_option("routing.url_prefix", cli.prefix.clone())?
            .set_override_option("routing.strategy", cli.strategy.map(MatchStrategy::as_str))?
            .set_override_option("stats.dump_interval", cli.dump.clone())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, BootstrapError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| BootstrapError::Address { addr, source })
    }

    pub fn prefix(&self) -> Prefix {
        Prefix::new(&self.routing.url_prefix)
    }

    pub fn matcher(&self) -> Box<dyn PathMatcher> {
        self.routing.strategy.matcher(self.prefix())
    }
}
