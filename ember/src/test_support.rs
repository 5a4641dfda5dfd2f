//! In-memory stand-in for the backing store, used by the facade tests.
//! Implements both command surfaces over one map, honours per-entry
//! expiry, records every command it sees and can be told to fail
//! specific commands.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use shared::{Error, Result, TtlMs};

use crate::ports::{AsyncCacheCommands, CacheBackend, SyncCacheCommands};

struct StoredEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Default)]
pub struct InMemoryBackend {
    entries: Mutex<HashMap<Vec<u8>, StoredEntry>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    closed: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `command` fail with a backend error.
    pub fn fail_command(&self, command: &'static str) {
        self.failing.lock().unwrap().insert(command);
    }

    /// Every command issued so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, command: &'static str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.calls.lock().unwrap().push(command);
        if self.failing.lock().unwrap().contains(command) {
            return Err(Error::Backend(format!("injected {command} failure")));
        }
        Ok(())
    }

    fn do_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.enter("get")?;
        let mut entries = self.entries.lock().unwrap();
        if entries.get(key).is_some_and(|entry| entry.is_expired()) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    fn do_put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()> {
        self.enter("put")?;
        let entry = StoredEntry {
            value: value.to_vec(),
            expires_at: ttl.map(|TtlMs(ms)| Instant::now() + std::time::Duration::from_millis(ms)),
        };
        self.entries.lock().unwrap().insert(key.to_vec(), entry);
        Ok(())
    }

    fn do_remove(&self, key: &[u8]) -> Result<()> {
        self.enter("remove")?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn do_expire(&self, key: &[u8], ttl: TtlMs) -> Result<()> {
        self.enter("expire")?;
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.expires_at = Some(Instant::now() + std::time::Duration::from_millis(ttl.0));
        }
        Ok(())
    }

    fn do_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.enter("keys")?;
        let entries = self.entries.lock().unwrap();
        let matches = |key: &str| match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        };
        Ok(entries
            .keys()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .filter(|key| matches(key))
            .collect())
    }

    fn do_del(&self, keys: &[String]) -> Result<()> {
        self.enter("del")?;
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key.as_bytes());
        }
        Ok(())
    }
}

impl SyncCacheCommands for InMemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.do_get(key)
    }

    fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()> {
        self.do_put(key, value, ttl)
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.do_remove(key)
    }

    fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()> {
        self.do_expire(key, ttl)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.do_keys(pattern)
    }

    fn del(&self, keys: &[String]) -> Result<()> {
        self.do_del(keys)
    }
}

#[async_trait]
impl AsyncCacheCommands for InMemoryBackend {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.do_get(key)
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<TtlMs>) -> Result<()> {
        self.do_put(key, value, ttl)
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.do_remove(key)
    }

    async fn expire(&self, key: &[u8], ttl: TtlMs) -> Result<()> {
        self.do_expire(key, ttl)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.do_keys(pattern)
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        self.do_del(keys)
    }
}

impl CacheBackend for InMemoryBackend {
    fn commands(&self) -> &dyn SyncCacheCommands {
        self
    }

    fn async_commands(&self) -> &dyn AsyncCacheCommands {
        self
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
