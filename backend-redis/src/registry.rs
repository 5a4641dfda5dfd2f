use std::collections::HashMap;
use std::sync::Arc;

use ember::Cache;
use ember::ports::CacheBackend;
use shared::config::CacheConfig;
use shared::{Error, Result};
use tracing::debug;

use crate::connection::RedisBackend;

/// Shared connections available to cache construction, resolved once
/// per cache.
///
/// A cache configuration picks its connection in this order: an
/// explicit `uri` opens a connection owned by that cache alone; a
/// `server` name selects a registered shared connection, with
/// `"default"` (any casing) selecting the primary; with neither set the
/// primary is used. No resolvable connection is a configuration error,
/// and the cache cannot be built.
#[derive(Default)]
pub struct ConnectionRegistry {
    primary: Option<Arc<dyn CacheBackend>>,
    named: HashMap<String, Arc<dyn CacheBackend>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            primary: Some(backend),
            named: HashMap::new(),
        }
    }

    pub fn set_primary(&mut self, backend: Arc<dyn CacheBackend>) {
        self.primary = Some(backend);
    }

    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn CacheBackend>) {
        self.named.insert(name.into(), backend);
    }

    /// Resolve the connection a cache configuration binds to.
    pub async fn resolve(&self, config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
        if let Some(uri) = &config.uri {
            debug!(cache = %config.name, "opening dedicated redis connection");
            let backend = RedisBackend::connect(uri).await?;
            return Ok(Arc::new(backend));
        }

        match config.server.as_deref() {
            Some(name) if name.eq_ignore_ascii_case("default") => self.primary(),
            Some(name) => self.named.get(name).cloned().ok_or_else(|| {
                Error::Configuration(format!("no redis server configured for name: {name}"))
            }),
            None => self.primary(),
        }
    }

    /// Resolve the connection and build the cache in one step.
    pub async fn create_cache(&self, config: &CacheConfig) -> Result<Cache> {
        let backend = self.resolve(config).await?;
        Cache::new(config, backend)
    }

    fn primary(&self) -> Result<Arc<dyn CacheBackend>> {
        self.primary.clone().ok_or_else(|| {
            Error::Configuration(
                "neither the primary redis server nor a cache specific server is configured"
                    .into(),
            )
        })
    }
}
