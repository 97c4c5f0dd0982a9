//! fencekv Lock - Fencing-token distributed locking
//!
//! This crate provides:
//! - Lock entry data model and lock statistics
//! - `LockStore`: the atomic primitives a shared store must offer, with
//!   in-memory and Redis implementations
//! - `FencedLock`: acquire / release / validate with monotonically increasing tokens
//! - `LockManager`: acquire-timeout, run, guaranteed release

pub mod lock;
pub mod manager;
pub mod model;
pub mod store;

pub use lock::{DEFAULT_LOCK_TTL, DistributedLock, FencedLock};
pub use manager::{DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_RELEASE_TIMEOUT, LockManager, LockManagerConfig};
pub use model::{LockEntry, LockStats, default_holder_id};
#[cfg(feature = "redis")]
pub use store::RedisLockStore;
pub use store::{LockStore, MemoryLockStore};
