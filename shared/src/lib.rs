// shared/src/lib.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
    #[error("backend: {0}")]
    Backend(String),
    #[error("loader: {0}")]
    Loader(String),
    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time-to-live in milliseconds, as the backend expects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlMs(pub u64);

impl From<std::time::Duration> for TtlMs {
    fn from(d: std::time::Duration) -> Self {
        TtlMs(d.as_millis() as u64)
    }
}

pub mod config;
