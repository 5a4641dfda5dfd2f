use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::Result;
use shared::config::CacheConfig;
use tracing::{debug, warn};

use crate::async_cache::AsyncCache;
use crate::domain::{CacheState, TtlPolicy};
use crate::ports::CacheBackend;
use crate::serialize::{KeySerializer, ValueSerializer};

/// Blocking cache facade over one backend connection.
///
/// Every operation serializes the key under the cache's namespace,
/// issues the backend commands it needs in a fixed order, and blocks the
/// calling thread for each round trip. The non-blocking equivalent is
/// reached through [`Cache::as_async`], which shares this cache's
/// serializers, TTL policy and connection.
#[derive(Clone, Debug)]
pub struct Cache {
    state: Arc<CacheState>,
}

impl Cache {
    /// Build a cache from its configuration block and a resolved backend
    /// connection. Fails if a serializer token is unknown.
    pub fn new(config: &CacheConfig, backend: Arc<dyn CacheBackend>) -> Result<Self> {
        let state = CacheState {
            name: config.name.clone(),
            ttl: TtlPolicy::from_config(config),
            key_serializer: KeySerializer::from_token(config.key_serializer.as_deref())?,
            value_serializer: ValueSerializer::from_token(config.value_serializer.as_deref())?,
            backend,
        };
        Ok(Self {
            state: Arc::new(state),
        })
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// The non-blocking facade sharing this cache's state and connection.
    pub fn as_async(&self) -> AsyncCache {
        AsyncCache::new(Arc::clone(&self.state))
    }

    /// Look up a key. A stored value that does not decode as `V` is a
    /// miss, not an error.
    pub fn get<K, V>(&self, key: &K) -> Result<Option<V>>
    where
        K: Serialize,
        V: DeserializeOwned,
    {
        let key = self.state.namespaced_key(key)?;
        self.read_value(&key)
    }

    /// Look up a key and, on a miss, compute the value with `loader` and
    /// store it. The read and the write are two independent backend
    /// interactions; a concurrent writer may overwrite the freshly
    /// stored value between them.
    pub fn get_with<K, V, F>(&self, key: &K, loader: F) -> Result<V>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<V>,
    {
        let key = self.state.namespaced_key(key)?;
        if let Some(value) = self.read_value(&key)? {
            return Ok(value);
        }

        let value = loader()?;
        self.write_value(&key, &value)?;
        Ok(value)
    }

    /// Store `value` only when the key holds nothing readable, returning
    /// the existing value otherwise. Check-then-act: two concurrent
    /// callers can both observe "absent" and both write, last write
    /// wins. Advisory, not linearizable.
    pub fn put_if_absent<K, V>(&self, key: &K, value: &V) -> Result<Option<V>>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
    {
        let key = self.state.namespaced_key(key)?;
        let existing: Option<V> = self.read_value(&key)?;
        if existing.is_some() {
            return Ok(existing);
        }

        self.write_value(&key, value)?;
        Ok(None)
    }

    /// Store a value under `expire_after_write` when configured. A value
    /// the serializer declines is removed instead, so the slot never
    /// keeps a stale entry.
    pub fn put<K, V>(&self, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key = self.state.namespaced_key(key)?;
        self.write_value(&key, value)
    }

    /// Remove one key. Removing an absent key is not an error.
    pub fn invalidate<K: Serialize>(&self, key: &K) -> Result<()> {
        let key = self.state.namespaced_key(key)?;
        self.state.backend.commands().remove(&key)
    }

    /// Remove every key under this cache's namespace. Scan-then-delete
    /// is not atomic: entries written between the two commands may
    /// survive the sweep.
    pub fn invalidate_all(&self) -> Result<()> {
        let commands = self.state.backend.commands();
        let keys = commands.keys(&self.state.keys_pattern())?;
        debug!(cache = %self.state.name, count = keys.len(), "bulk invalidation sweep");
        if keys.is_empty() {
            return Ok(());
        }
        commands.del(&keys)
    }

    /// Release the backend connection. Further operations on this cache
    /// or its async facade fail with [`shared::Error::Closed`].
    pub fn close(&self) -> Result<()> {
        self.state.backend.close()
    }

    fn read_value<V: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<V>> {
        let commands = self.state.backend.commands();
        let data = commands.get(key)?;
        if let (Some(_), Some(ttl)) = (&data, self.state.ttl.expire_after_access) {
            // Best-effort refresh: a failed EXPIRE must not turn a
            // successful read into an error.
            if let Err(err) = commands.expire(key, ttl) {
                warn!(cache = %self.state.name, error = %err, "ttl refresh failed");
            }
        }
        match data {
            Some(bytes) => Ok(self.state.value_serializer.deserialize(&bytes)),
            None => Ok(None),
        }
    }

    fn write_value<V: Serialize>(&self, key: &[u8], value: &V) -> Result<()> {
        let commands = self.state.backend.commands();
        match self.state.value_serializer.serialize(value) {
            Some(bytes) => commands.put(key, &bytes, self.state.ttl.expire_after_write),
            None => {
                warn!(cache = %self.state.name, "non-cacheable value, evicting key instead");
                commands.remove(key)
            }
        }
    }
}
