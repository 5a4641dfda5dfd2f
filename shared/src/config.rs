use std::time::Duration;

use tracing::warn;

/// Per-cache configuration block.
///
/// A cache is bound to exactly one connection, resolved in this order:
/// an explicit `uri` (the cache owns the connection), a named shared
/// connection (`server`, with `"default"` selecting the process-wide
/// primary), or the primary connection when neither is set.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub name: String,
    pub uri: Option<String>,
    pub server: Option<String>,
    pub key_serializer: Option<String>,
    pub value_serializer: Option<String>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: None,
            server: None,
            key_serializer: None,
            value_serializer: None,
            expire_after_write: None,
            expire_after_access: None,
        }
    }

    /// Load the configuration block for a named cache from the environment.
    ///
    /// Variables are keyed as `EMBER_CACHE_<NAME>_URI`, `_SERVER`,
    /// `_KEY_SERIALIZER`, `_VALUE_SERIALIZER`, `_EXPIRE_AFTER_WRITE_MS`
    /// and `_EXPIRE_AFTER_ACCESS_MS`, with `<NAME>` upper-cased and
    /// dashes mapped to underscores.
    pub fn from_env(name: &str) -> Self {
        let prefix = format!(
            "EMBER_CACHE_{}",
            name.to_uppercase().replace('-', "_")
        );
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        Self {
            name: name.to_string(),
            uri: var("URI"),
            server: var("SERVER"),
            key_serializer: var("KEY_SERIALIZER"),
            value_serializer: var("VALUE_SERIALIZER"),
            expire_after_write: var("EXPIRE_AFTER_WRITE_MS").and_then(|v| parse_millis(name, "EXPIRE_AFTER_WRITE_MS", &v)),
            expire_after_access: var("EXPIRE_AFTER_ACCESS_MS").and_then(|v| parse_millis(name, "EXPIRE_AFTER_ACCESS_MS", &v)),
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_key_serializer(mut self, token: impl Into<String>) -> Self {
        self.key_serializer = Some(token.into());
        self
    }

    pub fn with_value_serializer(mut self, token: impl Into<String>) -> Self {
        self.value_serializer = Some(token.into());
        self
    }

    pub fn with_expire_after_write(mut self, ttl: Duration) -> Self {
        self.expire_after_write = Some(ttl);
        self
    }

    pub fn with_expire_after_access(mut self, ttl: Duration) -> Self {
        self.expire_after_access = Some(ttl);
        self
    }
}

fn parse_millis(cache: &str, key: &str, raw: &str) -> Option<Duration> {
    match raw.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            warn!("ignoring non-numeric {} for cache '{}': {}", key, cache, raw);
            None
        }
    }
}
