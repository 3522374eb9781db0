//! Cache implementations: in-process with expiry, and Redis.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::Cache;

/// In-process cache. Expired entries are dropped when read and swept out on
/// every write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|(_, expires)| *expires > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> GraphMindResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self
                .entries
                .read()
                .map_err(|e| GraphMindError::cache(e.to_string()))?;
            match entries.get(key) {
                Some((value, expires)) if *expires > now => return Ok(Some(value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        self.entries
            .write()
            .map_err(|e| GraphMindError::cache(e.to_string()))?
            .remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> GraphMindResult<()> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| GraphMindError::cache(e.to_string()))?;
        entries.retain(|_, (_, expires)| *expires > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

/// Redis cache using `SET key value EX ttl`.
pub struct RedisCache {
    connection: MultiplexedConnection,
    prefix: String,
}

impl RedisCache {
    pub async fn new(url: &str) -> GraphMindResult<Self> {
        let client = Client::open(url)
            .map_err(|e| GraphMindError::cache(format!("Failed to create Redis client: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| GraphMindError::cache(format!("Failed to connect to Redis: {}", e)))?;
        Ok(Self {
            connection,
            prefix: "graphmind:".to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> GraphMindResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(self.key(key))
            .await
            .map_err(|e| GraphMindError::cache(format!("Redis GET failed: {}", e)))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> GraphMindResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| GraphMindError::cache(format!("Redis SET failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.put("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache.put("k", "v", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_write_sweeps_unread_expired_entries() {
        let cache = MemoryCache::new();
        for key in ["a", "b", "c"] {
            cache.put(key, "v", Duration::from_millis(20)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(40)).await;

        cache.put("d", "v", Duration::from_secs(60)).await.unwrap();
        let stored: Vec<String> = cache.entries.read().unwrap().keys().cloned().collect();
        assert_eq!(stored, vec!["d".to_string()]);
    }
}
