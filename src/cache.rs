//! On-disk cache for provider search results

use fjall::Keyspace;
use serde::Deserialize;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::{Debug, Display};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::error::{Result, SidequestError};

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

/// TTL-aware key/value cache backed by a fjall keyspace.
///
/// Values are encoded with postcard; expired entries are removed lazily on read.
pub struct PersistentCache {
    store: Keyspace,
}

fn cache_error(action: &str, error: impl Display) -> SidequestError {
    SidequestError::cache(format!("Failed to {}: {}", action, error))
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    let value = store.get(key).map_err(|e| cache_error("read entry", e))?;
    Ok(value.map(|v| v.to_vec()))
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| cache_error("read clock", e))
}

impl PersistentCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| cache_error("open cache database", e))?;
        let items = db
            .keyspace("provider_cache", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| cache_error("open cache keyspace", e))?;
        Ok(PersistentCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = unix_now()?.saturating_add(ttl.as_secs());
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry).map_err(|e| cache_error("encode entry", e))?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| cache_error("join cache task", e))?
            .map_err(|e| cache_error("write entry", e))?;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes))
                .await
                .map_err(|e| cache_error("join cache task", e))??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> =
            postcard::from_bytes(&bytes).map_err(|e| cache_error("decode entry", e))?;

        if unix_now()? < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(|e| cache_error("join cache task", e))?
            .map_err(|e| cache_error("remove entry", e))?;
        Ok(())
    }
}
