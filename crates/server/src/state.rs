//! Application state shared across handlers.

use std::sync::Arc;

use retroshelf_client::SyncThrottler;
use retroshelf_core::{AppConfig, BookmarkStore, Error, InjectionPipeline, LockRegistry, RenderCache};

/// Services built once at startup.
///
/// The injection pipeline and the sync throttler share one lock registry.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub render_cache: Arc<RenderCache>,
    pub locks: Arc<LockRegistry>,
    pub injector: Arc<InjectionPipeline>,
    pub syncer: Arc<SyncThrottler>,
    pub bookmarks: Arc<BookmarkStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let locks = Arc::new(LockRegistry::new());
        let syncer = SyncThrottler::from_config(&config, Arc::clone(&locks))?;
        Ok(Self::with_syncer(config, locks, syncer))
    }

    /// Build the state around an existing sync throttler, which must use
    /// `locks` as its lock registry.
    pub fn with_syncer(config: AppConfig, locks: Arc<LockRegistry>, syncer: SyncThrottler) -> Self {
        let render_cache = RenderCache::new(&config.template_path, config.roms_dir(), config.gzip_enabled);
        let injector = InjectionPipeline::from_config(&config, Arc::clone(&locks));
        let bookmarks = BookmarkStore::new(config.bookmarks_path());

        Self {
            config: Arc::new(config),
            render_cache: Arc::new(render_cache),
            locks,
            injector: Arc::new(injector),
            syncer: Arc::new(syncer),
            bookmarks: Arc::new(bookmarks),
        }
    }
}
