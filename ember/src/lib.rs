#![deny(clippy::all)]

pub mod domain;
pub mod ports;
pub mod serialize;

mod async_cache;
mod sync_cache;

pub use async_cache::AsyncCache;
pub use sync_cache::Cache;

#[cfg(test)]
pub(crate) mod test_support;
