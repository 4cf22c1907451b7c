//! Cache layer
//!
//! Caching of public read models (service list, journal, stats...) for the
//! JCPC site. Entries are JSON-serialized so any `Serialize` value fits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use jcpc::cache::{create_cache, CacheLayer};
//! use jcpc::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default())?;
//! cache.set("services:public", &services, Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::{CacheConfig, CacheDriver};

/// Cache layer trait
///
/// The methods are generic, so the trait is not object safe. Use the
/// `Cache` enum for runtime selection of the backend.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

pub use memory::MemoryCache;

/// Cache backend selected from configuration
#[derive(Debug)]
pub enum CacheBackend {
    /// In-memory cache using moka
    Memory(MemoryCache),
}

/// The configured backend plus an invalidation generation.
///
/// Every delete bumps the generation under its write lock, so a
/// [`Cache::get_or_load`] that started before an invalidation drops its
/// result instead of caching rows read before the write.
#[derive(Debug)]
pub struct Cache {
    backend: CacheBackend,
    generation: RwLock<u64>,
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match &self.backend {
            CacheBackend::Memory(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match &self.backend {
            CacheBackend::Memory(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        match &self.backend {
            CacheBackend::Memory(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        match &self.backend {
            CacheBackend::Memory(cache) => cache.delete_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        match &self.backend {
            CacheBackend::Memory(cache) => cache.clear().await,
        }
    }
}

impl Cache {
    pub fn new(backend: CacheBackend) -> Self {
        Self {
            backend,
            generation: RwLock::new(0),
        }
    }

    /// Read-through lookup: the cached value for `key`, or the result of
    /// `load` stored for `ttl`. A failing cache only costs a reload.
    ///
    /// The loaded value is returned but not stored when a delete ran while
    /// `load` was in flight.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => tracing::debug!("Cache read failed for {}: {}", key, e),
        }

        let started = *self.generation.read().await;
        let value = load().await?;

        // Held across the write so no delete can slip in after the check
        let generation = self.generation.read().await;
        if *generation != started {
            tracing::debug!("Skipping cache write for {}: invalidated during load", key);
        } else if let Err(e) = self.set(key, &value, ttl).await {
            tracing::debug!("Cache write failed for {}: {}", key, e);
        }
        Ok(value)
    }

    /// Drop every entry of a namespace: `invalidate("posts")` clears `posts:*`
    pub async fn invalidate(&self, namespace: &str) {
        if let Err(e) = self.delete_pattern(&format!("{}:*", namespace)).await {
            tracing::warn!("Failed to invalidate {} cache: {}", namespace, e);
        }
    }
}

/// Create a cache instance based on configuration
pub fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    match config.driver {
        CacheDriver::Memory => {
            let backend = CacheBackend::Memory(MemoryCache::new());
            Ok(Arc::new(Cache::new(backend)))
        }
    }
}
