#![deny(clippy::all)]

mod connection;
mod registry;

pub use connection::RedisBackend;
pub use registry::ConnectionRegistry;
