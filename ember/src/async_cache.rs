use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::Result;
use tracing::{debug, warn};

use crate::domain::CacheState;

/// Non-blocking cache facade sharing its state and connection with the
/// [`Cache`](crate::Cache) it was created from.
///
/// Each operation is a fixed chain of backend stages; a stage only runs
/// after the previous one resolved, and the first failing stage
/// short-circuits the rest and becomes the operation's error. The
/// calling task is never blocked.
#[derive(Clone, Debug)]
pub struct AsyncCache {
    state: Arc<CacheState>,
}

impl AsyncCache {
    pub(crate) fn new(state: Arc<CacheState>) -> Self {
        Self { state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Look up a key. On a hit with `expire_after_access` configured the
    /// TTL refresh is chained after the read and the operation settles
    /// only once the refresh has, propagating its failure.
    pub async fn get<K, V>(&self, key: &K) -> Result<Option<V>>
    where
        K: Serialize,
        V: DeserializeOwned,
    {
        let key = self.state.namespaced_key(key)?;
        let commands = self.state.backend.async_commands();
        match commands.get(&key).await? {
            Some(data) => self.finish_read(&key, &data).await,
            None => Ok(None),
        }
    }

    /// Look up a key and, on a miss (including a stored value that does
    /// not decode), compute the value with `loader` and chain the write.
    /// A loader error settles the operation without attempting a write.
    pub async fn get_with<K, V, F>(&self, key: &K, loader: F) -> Result<V>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<V>,
    {
        let key = self.state.namespaced_key(key)?;
        let commands = self.state.backend.async_commands();
        if let Some(data) = commands.get(&key).await? {
            let hit: Option<V> = self.finish_read(&key, &data).await?;
            if let Some(value) = hit {
                return Ok(value);
            }
        }

        let value = loader()?;
        self.write_value(&key, &value).await?;
        Ok(value)
    }

    /// Store `value` only when the key holds nothing, returning the
    /// existing value otherwise (the candidate is dropped). A candidate
    /// the serializer declines issues no write at all and the operation
    /// settles as a success with no previous value.
    pub async fn put_if_absent<K, V>(&self, key: &K, value: &V) -> Result<Option<V>>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
    {
        let key = self.state.namespaced_key(key)?;
        let commands = self.state.backend.async_commands();
        if let Some(data) = commands.get(&key).await? {
            return self.finish_read(&key, &data).await;
        }

        if let Some(bytes) = self.state.value_serializer.serialize(value) {
            commands
                .put(&key, &bytes, self.state.ttl.expire_after_write)
                .await?;
        }
        Ok(None)
    }

    /// Store a value under `expire_after_write` when configured; a value
    /// the serializer declines removes the key instead.
    pub async fn put<K, V>(&self, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key = self.state.namespaced_key(key)?;
        self.write_value(&key, value).await
    }

    /// Remove one key. Removing an absent key is not an error.
    pub async fn invalidate<K: Serialize>(&self, key: &K) -> Result<()> {
        let key = self.state.namespaced_key(key)?;
        self.state.backend.async_commands().remove(&key).await
    }

    /// Remove every key under this cache's namespace: a KEYS scan
    /// chained into one DEL. Not atomic with respect to concurrent
    /// writers.
    pub async fn invalidate_all(&self) -> Result<()> {
        let commands = self.state.backend.async_commands();
        let keys = commands.keys(&self.state.keys_pattern()).await?;
        debug!(cache = %self.state.name, count = keys.len(), "bulk invalidation sweep");
        if keys.is_empty() {
            return Ok(());
        }
        commands.del(&keys).await
    }

    /// Deserialize a read hit and, when the value is usable and
    /// `expire_after_access` is set, chain the TTL refresh before
    /// settling. Undecodable bytes settle immediately as a miss.
    async fn finish_read<V: DeserializeOwned>(&self, key: &[u8], data: &[u8]) -> Result<Option<V>> {
        let deserialized = self.state.value_serializer.deserialize(data);
        if let (Some(_), Some(ttl)) = (&deserialized, self.state.ttl.expire_after_access) {
            self.state.backend.async_commands().expire(key, ttl).await?;
        }
        Ok(deserialized)
    }

    async fn write_value<V: Serialize>(&self, key: &[u8], value: &V) -> Result<()> {
        let commands = self.state.backend.async_commands();
        match self.state.value_serializer.serialize(value) {
            Some(bytes) => {
                commands
                    .put(key, &bytes, self.state.ttl.expire_after_write)
                    .await
            }
            None => {
                warn!(cache = %self.state.name, "non-cacheable value, evicting key instead");
                commands.remove(key).await
            }
        }
    }
}
