//! fencekv Common - Shared types for the fenced key-value layer
//!
//! This crate provides the foundational types used across all fencekv components:
//! - `FencingToken`: the monotonically increasing token issued on lock acquisition
//! - `KvError`: the tagged error taxonomy surfaced to every caller
//! - Shared key-space constants

pub mod error;
pub mod token;

// Re-exports for convenience
pub use error::{KvError, KvResult, TokenRejection};
pub use token::FencingToken;

/// Prefix under which lock entries are stored in the shared store
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// Key of the shared token counter.
///
/// Lives outside the `lock:` namespace so that no resource name can map onto it.
pub const TOKEN_COUNTER_KEY: &str = "fence:token_counter";

/// Prefix under which user values are stored in the shared store.
///
/// Keeps caller-chosen keys out of the lock and counter key space.
pub const VALUE_KEY_PREFIX: &str = "kv:";

/// Build the shared-store key holding the lock entry for `resource`
pub fn lock_key(resource: &str) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, resource)
}

/// Build the shared-store key holding the value for a caller key
pub fn value_key(key: &str) -> String {
    format!("{}{}", VALUE_KEY_PREFIX, key)
}
