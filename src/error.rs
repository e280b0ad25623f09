//! Startup error types
//!
//! Everything that can go wrong before the server accepts connections. All of
//! these are fatal; request-time failures are turned into responses instead.

use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        source: AddrParseError,
    },

    #[error("cannot resolve serving root '{}': {source}", path.display())]
    ResolveRoot { path: PathBuf, source: io::Error },

    #[error("serving root '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("chroot to '{}' failed: {source}", path.display())]
    Chroot { path: PathBuf, source: io::Error },

    #[error("cannot look up user '{user}': {source}")]
    UserLookup { user: String, source: io::Error },

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("cannot switch to user '{user}': {source}")]
    DropPrivileges { user: String, source: io::Error },

    #[cfg(not(unix))]
    #[error("privilege isolation is not supported on this platform")]
    IsolationUnsupported,

    #[error("cannot listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("cannot start runtime: {0}")]
    Runtime(#[source] io::Error),
}
