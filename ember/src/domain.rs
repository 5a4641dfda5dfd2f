use std::sync::Arc;

use serde::Serialize;
use shared::config::CacheConfig;
use shared::{Error, Result, TtlMs};

use crate::ports::CacheBackend;
use crate::serialize::{KeySerializer, ValueSerializer};

/// The two independent expiry policies of a cache.
///
/// `expire_after_write` is applied on every PUT; `expire_after_access`
/// refreshes the deadline on every read hit. Both are fixed at cache
/// construction and apply identically to the sync and async paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct TtlPolicy {
    pub expire_after_write: Option<TtlMs>,
    pub expire_after_access: Option<TtlMs>,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            expire_after_write: config.expire_after_write.map(TtlMs::from),
            expire_after_access: config.expire_after_access.map(TtlMs::from),
        }
    }
}

/// State shared between a cache and its async facade: the name, the
/// resolved serializers, the TTL policy and the one backend connection.
pub(crate) struct CacheState {
    pub name: String,
    pub ttl: TtlPolicy,
    pub key_serializer: KeySerializer,
    pub value_serializer: ValueSerializer,
    pub backend: Arc<dyn CacheBackend>,
}

impl CacheState {
    /// Serialize a key and scope it under this cache's namespace,
    /// `"<name>:<serialized key>"`. A key with no serialized form is a
    /// programming error and fails before any backend call.
    pub fn namespaced_key<K: Serialize>(&self, key: &K) -> Result<Vec<u8>> {
        let serialized = self.key_serializer.serialize(key).ok_or_else(|| {
            Error::InvalidKey(format!("cache '{}': key has no serialized form", self.name))
        })?;

        let mut namespaced = Vec::with_capacity(self.name.len() + 1 + serialized.len());
        namespaced.extend_from_slice(self.name.as_bytes());
        namespaced.push(b':');
        namespaced.extend_from_slice(&serialized);
        Ok(namespaced)
    }

    /// Pattern matching every key under this cache's namespace.
    pub fn keys_pattern(&self) -> String {
        format!("{}:*", self.name)
    }
}

impl std::fmt::Debug for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheState")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("key_serializer", &self.key_serializer)
            .field("value_serializer", &self.value_serializer)
            .finish()
    }
}
