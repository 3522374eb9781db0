//! Factory for the store-side collaborators.

use std::path::Path;
use std::sync::Arc;

use graphmind_core::config::GraphMindConfig;
use graphmind_core::error::GraphMindResult;
use graphmind_core::traits::{
    Cache, EntityDirectory, GraphStore, GraphStoreConfig, GraphStoreProvider,
};

use crate::cache::{MemoryCache, RedisCache};
use crate::falkordb::FalkorDbStore;
use crate::sqlite::SqliteDirectory;

/// Factory for creating stores from configuration.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a graph store from the given configuration.
    pub async fn graph_store(config: &GraphStoreConfig) -> GraphMindResult<Arc<dyn GraphStore>> {
        match config.provider {
            GraphStoreProvider::FalkorDb => {
                let store = FalkorDbStore::new(config.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Open the SQLite directory at `path`, creating parent directories.
    pub fn directory(path: impl AsRef<Path>) -> GraphMindResult<Arc<dyn EntityDirectory>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Arc::new(SqliteDirectory::open(path)?))
    }

    /// Redis cache when a URL is given, in-process otherwise.
    pub async fn cache(url: Option<&str>) -> GraphMindResult<Arc<dyn Cache>> {
        match url {
            Some(url) => Ok(Arc::new(RedisCache::new(url).await?)),
            None => Ok(Arc::new(MemoryCache::new())),
        }
    }

    /// Directory and cache for `config`.
    pub async fn from_config(
        config: &GraphMindConfig,
    ) -> GraphMindResult<(Arc<dyn EntityDirectory>, Arc<dyn Cache>)> {
        let directory = Self::directory(&config.directory_path)?;
        let cache = Self::cache(config.cache_url.as_deref()).await?;
        Ok((directory, cache))
    }
}
