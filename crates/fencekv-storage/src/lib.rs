//! fencekv Storage - Key-value backends guarded by fencing tokens
//!
//! This crate provides:
//! - `KvStore`: the backing-store contract (save / retrieve / delete)
//! - `MemoryStore` and `RedisStore` backends
//! - `LockedStore`: serializes operations per key through the lock manager and
//!   rejects stale fencing tokens
//! - `StorageType`: backend selection

pub mod locked;
pub mod memory;
pub mod model;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

pub use locked::LockedStore;
pub use memory::MemoryStore;
pub use model::StorageType;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use traits::KvStore;
