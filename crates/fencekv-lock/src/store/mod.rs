//! Shared lock store abstraction
//!
//! The token counter and the lock-entry table live in a store shared by every
//! process. Only the atomic primitives below may touch them; no client-side
//! check-then-act sequence is allowed outside these operations.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryLockStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisLockStore;

use std::time::Duration;

use async_trait::async_trait;

use fencekv_common::KvResult;

/// Atomic operations a shared store must offer to host fencing-token locks.
///
/// Every operation fails with `KvError::Transport` when the store is unreachable.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically increment `counter` and return the new value (starting at 1)
    async fn increment(&self, counter: &str) -> KvResult<i64>;

    /// Store `value` under `key` with an expiry of `ttl`, only if no live value exists.
    ///
    /// Returns `false` when a live value is already present.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool>;

    /// Read the live value under `key`
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Delete `key` only if its live value still equals `expected`, as one atomic step.
    ///
    /// Returns `false` when the value is absent or differs.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> KvResult<bool>;
}
