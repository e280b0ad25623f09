//! File cache module
//!
//! Keeps the bytes of recently served files from the serving root in memory.
//! Entries are bounded by count and per-file size, evicted least recently
//! accessed first, dropped after an idle period and swept periodically for
//! files that changed on disk.

mod handler;

use hyper::body::Bytes;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::CacheConfig;
use crate::logger;
use crate::periodic::PeriodicTask;

/// Limits applied to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of cached files, 0 disables caching
    pub max_items: usize,
    /// Files larger than this are served but never cached
    pub max_size: u64,
    /// Idle time after which an entry is dropped, zero keeps entries forever
    pub expire: Duration,
    /// Sweep period, zero disables the sweeper
    pub every: Duration,
}

impl From<&CacheConfig> for CacheSettings {
    fn from(cfg: &CacheConfig) -> Self {
        Self {
            max_items: usize::try_from(cfg.max_items).unwrap_or(usize::MAX),
            max_size: cfg.max_size_bytes,
            expire: Duration::from_secs(cfg.expire_seconds),
            every: Duration::from_secs(cfg.garbage_interval_seconds),
        }
    }
}

/// File content as served
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub content: Bytes,
    pub modified: SystemTime,
}

/// Point-in-time view of the cache for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub items: usize,
    pub max_items: usize,
    pub bytes: u64,
    pub max_size: u64,
    /// Cached names, sorted
    pub files: Vec<String>,
}

pub struct FileCache {
    root: PathBuf,
    settings: CacheSettings,
    items: Cache<String, CachedFile>,
}

impl FileCache {
    /// Create a cache serving files below `root`
    ///
    /// `root` should be canonical; resolved files must stay inside it.
    pub fn new(root: impl Into<PathBuf>, settings: CacheSettings) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(u64::try_from(settings.max_items).unwrap_or(u64::MAX))
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(log_removal);
        if !settings.expire.is_zero() {
            builder = builder.time_to_idle(settings.expire);
        }

        Self {
            root: root.into(),
            settings,
            items: builder.build(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start the background sweeper, if a sweep period is configured
    pub fn start(self: &Arc<Self>) -> Option<PeriodicTask> {
        if self.settings.every.is_zero() {
            return None;
        }
        let cache = Arc::clone(self);
        Some(PeriodicTask::spawn("cache-sweeper", self.settings.every, move || {
            let cache = Arc::clone(&cache);
            async move { cache.sweep().await }
        }))
    }

    pub fn stats(&self) -> CacheStats {
        self.items.run_pending_tasks();
        let mut bytes = 0;
        let mut files = Vec::new();
        for (name, file) in self.items.iter() {
            bytes += file.content.len() as u64;
            files.push(name.as_ref().clone());
        }
        files.sort();
        CacheStats {
            items: files.len(),
            max_items: self.settings.max_items,
            bytes,
            max_size: self.settings.max_size,
            files,
        }
    }

    /// Return the content of `name`, from memory when the cached copy is current
    ///
    /// `path` and `metadata` describe the file on disk. A miss reads the file
    /// and caches it when it fits the limits.
    pub async fn fetch(&self, name: &str, path: &Path, metadata: &Metadata) -> io::Result<CachedFile> {
        let modified = modified_time(metadata);
        if let Some(file) = self.lookup(name, modified) {
            return Ok(file);
        }

        let content = Bytes::from(fs::read(path).await?);
        let file = CachedFile { content, modified };
        if self.is_cacheable(file.content.len() as u64) {
            self.items.insert(name.to_string(), file.clone());
        }
        Ok(file)
    }

    /// Drop an entry, returning whether it was cached
    pub fn evict(&self, name: &str) -> bool {
        self.items.remove(name).is_some()
    }

    /// Apply pending expirations and drop entries whose file changed or vanished
    pub async fn sweep(&self) {
        self.items.run_pending_tasks();
        let candidates: Vec<(String, SystemTime)> = self
            .items
            .iter()
            .map(|(name, file)| (name.as_ref().clone(), file.modified))
            .collect();

        for (name, cached_mtime) in candidates {
            let current = fs::metadata(self.root.join(&name)).await;
            let changed = match current {
                Ok(meta) => !meta.is_file() || modified_time(&meta) != cached_mtime,
                Err(_) => true,
            };
            if changed {
                self.evict(&name);
            }
        }
    }

    fn lookup(&self, name: &str, modified: SystemTime) -> Option<CachedFile> {
        let file = self.items.get(name)?;
        if file.modified != modified {
            // stale copies go away, the caller reloads from disk
            self.evict(name);
            return None;
        }
        Some(file)
    }

    const fn is_cacheable(&self, size: u64) -> bool {
        self.settings.max_items > 0 && size <= self.settings.max_size
    }
}

fn log_removal(name: Arc<String>, _file: CachedFile, cause: RemovalCause) {
    let reason = match cause {
        RemovalCause::Expired => "idle",
        RemovalCause::Explicit => "changed on disk",
        RemovalCause::Size => "cache full",
        RemovalCause::Replaced => return,
    };
    logger::log_cache_eviction(&name, reason);
}

fn modified_time(metadata: &Metadata) -> SystemTime {
    metadata.modified().unwrap_or(UNIX_EPOCH)
}
