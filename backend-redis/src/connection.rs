use std::sync::Mutex;

use async_trait::async_trait;
use ember::ports::{AsyncCacheCommands, CacheBackend, SyncCacheCommands};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Commands};
use shared::{Error, Result, TtlMs};
use tracing::debug;

/// One established Redis connection, exposing the blocking and the
/// non-blocking command surface over the same server.
///
/// The blocking surface drives a dedicated socket behind a mutex; the
/// non-blocking surface drives the client's multiplexed channel, which
/// serializes individual commands on its own. `close` releases both;
/// commands issued afterwards fail with [`shared::Error::Closed`].
pub struct RedisBackend {
    sync: Mutex<Option<redis::Connection>>,
    multiplexed: Mutex<Option<MultiplexedConnection>>,
}

impl RedisBackend {
    /// Connect to the server at `uri`. The blocking connect happens
    /// once, at configuration time. An unparsable URI is a
    /// configuration error; a refused connection is a backend error.
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = redis::Client::open(uri)
            .map_err(|err| Error::Configuration(format!("invalid redis uri '{uri}': {err}")))?;
        let multiplexed = client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_err)?;
        let sync = client.get_connection().map_err(backend_err)?;
        debug!(uri = %uri, "redis connection established");

        Ok(Self {
            sync: Mutex::new(Some(sync)),
            multiplexed: Mutex::new(Some(multiplexed)),
        })
    }

    fn with_sync<T>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let mut guard = self
            .sync
            .lock()
            .map_err(|_| Error::Backend("connection lock poisoned".into()))?;
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        f(conn).map_err(backend_err)
    }

    fn async_conn(&self) -> Result<MultiplexedConnection> {
        let guard = self
            .multiplexed
            .lock()
            .map_err(|_| Error::Backend("connection lock poisoned".into()))?;
        guard.clone().ok_or(Error::Closed)
    }
}

impl SyncCacheCommands for RedisBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_sync(|conn| conn.get(key))
    }

    fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()> {
        self.with_sync(|conn| match ttl {
            Some(TtlMs(ms)) => conn.pset_ex(key, value, ms),
            None => conn.set(key, value),
        })
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.with_sync(|conn| conn.del(key))
    }

    fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()> {
        self.with_sync(|conn| conn.pexpire(key, ttl.0 as i64))
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.with_sync(|conn| conn.keys(pattern))
    }

    fn del(&self, keys: &[String]) -> Result<()> {
        self.with_sync(|conn| conn.del(keys))
    }
}

#[async_trait]
impl AsyncCacheCommands for RedisBackend {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut conn = self.async_conn()?;
        conn.get(key).await.map_err(backend_err)
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()> {
        let mut conn = self.async_conn()?;
        match ttl {
            Some(TtlMs(ms)) => conn.pset_ex(key, value, ms).await.map_err(backend_err),
            None => conn.set(key, value).await.map_err(backend_err),
        }
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let mut conn = self.async_conn()?;
        conn.del(key).await.map_err(backend_err)
    }

    async fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()> {
        let mut conn = self.async_conn()?;
        conn.pexpire(key, ttl.0 as i64).await.map_err(backend_err)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.async_conn()?;
        conn.keys(pattern).await.map_err(backend_err)
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        let mut conn = self.async_conn()?;
        conn.del(keys).await.map_err(backend_err)
    }
}

impl CacheBackend for RedisBackend {
    fn commands(&self) -> &dyn SyncCacheCommands {
        self
    }

    fn async_commands(&self) -> &dyn AsyncCacheCommands {
        self
    }

    fn close(&self) -> Result<()> {
        // Blocking socket first, then the multiplexed channel. Dropping
        // the handles releases them even when a lock is poisoned, at
        // the latest when the backend itself drops.
        if let Ok(mut guard) = self.sync.lock() {
            guard.take();
        }
        if let Ok(mut guard) = self.multiplexed.lock() {
            guard.take();
        }
        debug!("redis connection closed");
        Ok(())
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish()
    }
}

fn backend_err(err: redis::RedisError) -> Error {
    Error::Backend(err.to_string())
}
