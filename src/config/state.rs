// Application state module
// Runtime objects shared by every connection

use std::path::PathBuf;
use std::sync::Arc;

use super::types::Config;
use crate::filecache::{CacheSettings, FileCache};
use crate::handler::RequestRouter;

/// Application state
pub struct AppState {
    pub config: Config,
    pub cache: Arc<FileCache>,
    pub router: RequestRouter<Arc<FileCache>>,
}

impl AppState {
    /// Build the cache over `root` and put the prefix router in front of it
    ///
    /// `root` is the serving directory as the process sees it, i.e. `/` after
    /// a chroot.
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        let cache = Arc::new(FileCache::new(root, CacheSettings::from(&config.cache)));
        let router = RequestRouter::new(config.matcher(), Arc::clone(&cache));

        Self {
            config,
            cache,
            router,
        }
    }
}
