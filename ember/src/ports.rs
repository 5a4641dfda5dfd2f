#![deny(clippy::all)]

use async_trait::async_trait;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for underlying store clients.
// Both command surfaces are pure pass-throughs: no retry, batching or
// pipelining happens here; all composition lives in the cache facades.

/// Blocking command surface over the backing store.
pub trait SyncCacheCommands: Send + Sync + 'static {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()>;
    fn remove(&self, key: &[u8]) -> Result<()>;
    fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()>;
    fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    fn del(&self, keys: &[String]) -> Result<()>;
}

/// Non-blocking command surface over the same store.
#[async_trait]
pub trait AsyncCacheCommands: Send + Sync + 'static {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()>;
    async fn remove(&self, key: &[u8]) -> Result<()>;
    async fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn del(&self, keys: &[String]) -> Result<()>;
}

/// One established connection to the backing store, yielding its blocking
/// and non-blocking command surfaces. A cache instance holds exactly one
/// backend for its whole lifetime; `close` releases the connection and
/// every later command fails with [`shared::Error::Closed`].
pub trait CacheBackend: Send + Sync + 'static {
    fn commands(&self) -> &dyn SyncCacheCommands;
    fn async_commands(&self) -> &dyn AsyncCacheCommands;
    fn close(&self) -> Result<()>;
}
