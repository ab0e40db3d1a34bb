use std::path::PathBuf;
use std::sync::Arc;

use crate::adapter::{FanfouAdapter, MastodonAdapter, Sources};
use crate::app::error::{ConfluenceError, Result};
use crate::compose::Composer;
use crate::config::Config;
use crate::gateway::{Gateway, HttpNetwork, Network};
use crate::store::{SqliteStore, Store};
use crate::thread::ThreadCacheManager;
use crate::timeline::TimelineSynchronizer;

pub struct AppContext {
    pub config: Config,
    pub gateway: Arc<Gateway>,
    pub sources: Sources,
    pub timeline: TimelineSynchronizer,
    pub threads: ThreadCacheManager,
    pub composer: Composer,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let network = Arc::new(HttpNetwork::new(&config.http)?);
        Self::with_parts(config, store, network)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let network = Arc::new(HttpNetwork::new(&config.http)?);
        Self::with_parts(config, store, network)
    }

    /// Wire every component around an explicit store and transport.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store + Send + Sync>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let gateway = Arc::new(Gateway::new(store, network, &config.cache)?);

        let fanfou = Arc::new(FanfouAdapter::new(gateway.clone(), &config.fanfou)?);
        let mastodon = Arc::new(MastodonAdapter::new(gateway.clone(), &config.mastodon)?);
        let sources = Sources::new(fanfou, mastodon);

        Ok(Self {
            timeline: TimelineSynchronizer::new(sources.clone(), config.timeline.page_size),
            threads: ThreadCacheManager::new(sources.clone()),
            composer: Composer::new(sources.clone()),
            gateway,
            sources,
            config,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ConfluenceError::Config("Could not find data directory".into()))?;
        let confluence_dir = data_dir.join("confluence");
        std::fs::create_dir_all(&confluence_dir)?;
        Ok(confluence_dir.join("cache.db"))
    }
}
