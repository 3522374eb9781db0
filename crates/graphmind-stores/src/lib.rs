//! graphmind-stores - Storage backends for graphmind.
//!
//! # Backends
//!
//! - **FalkorDB** - per-user graphs over the Redis protocol
//! - **SQLite** - the canonical entity directory
//! - **Caches** - in-process with expiry, or Redis

pub mod cache;
pub mod falkordb;
mod factory;
pub mod sqlite;

pub use cache::{MemoryCache, RedisCache};
pub use factory::StoreFactory;
pub use falkordb::FalkorDbStore;
pub use sqlite::SqliteDirectory;

// Re-export core traits
pub use graphmind_core::traits::{Cache, EntityDirectory, GraphStore, GraphStoreConfig};
