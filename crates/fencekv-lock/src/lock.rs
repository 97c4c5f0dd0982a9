//! Fencing-token lock primitive
//!
//! Provides:
//! - `DistributedLock`: acquire / release / validate contract
//! - `FencedLock`: implementation over any `LockStore`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use fencekv_common::{
    FencingToken, KvError, KvResult, TOKEN_COUNTER_KEY, TokenRejection, lock_key,
};

use crate::model::{LockEntry, default_holder_id};
use crate::store::LockStore;

/// Default lock TTL
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(5);

/// Mutual exclusion on named resources with fencing tokens
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Take the lock on `resource`, minting a new fencing token.
    ///
    /// Fails with `LockHeld` if another holder owns a live entry.
    async fn acquire(&self, resource: &str) -> KvResult<FencingToken>;

    /// Release the lock on `resource` if it is still held with `token`.
    ///
    /// Releasing an expired or already released lock succeeds. A live entry
    /// carrying another token is left untouched and `InvalidToken` is returned.
    async fn release(&self, resource: &str, token: FencingToken) -> KvResult<()>;

    /// True iff a live entry for `resource` holds exactly `token`
    async fn validate_token(&self, resource: &str, token: FencingToken) -> KvResult<bool>;
}

/// Lock primitive over a shared `LockStore`
pub struct FencedLock {
    store: Arc<dyn LockStore>,
    ttl: Duration,
    holder_id: String,
}

impl FencedLock {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_LOCK_TTL,
            holder_id: default_holder_id(),
        }
    }

    /// Override the entry TTL; a zero duration keeps the current value
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.ttl = ttl;
        }
        self
    }

    pub fn with_holder_id(mut self, holder_id: impl Into<String>) -> Self {
        self.holder_id = holder_id.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }
}

#[async_trait]
impl DistributedLock for FencedLock {
    async fn acquire(&self, resource: &str) -> KvResult<FencingToken> {
        let key = lock_key(resource);

        let token = FencingToken::new(self.store.increment(TOKEN_COUNTER_KEY).await?);
        let entry = LockEntry::new(token, self.holder_id.as_str()).encode()?;

        if !self.store.set_if_absent(&key, &entry, self.ttl).await? {
            debug!(resource, %token, "lock already held");
            return Err(KvError::lock_held(resource));
        }

        debug!(resource, %token, ttl_ms = self.ttl.as_millis() as u64, "lock acquired");
        Ok(token)
    }

    async fn release(&self, resource: &str, token: FencingToken) -> KvResult<()> {
        let key = lock_key(resource);

        let Some(raw) = self.store.get(&key).await? else {
            debug!(resource, %token, "lock already expired or released");
            return Ok(());
        };

        let entry = LockEntry::decode(&raw)?;
        if entry.token != token {
            return Err(KvError::invalid_token(
                resource,
                token,
                TokenRejection::Mismatch {
                    current: entry.token,
                },
            ));
        }

        // Compare against the exact bytes read so a re-acquired lock is never deleted
        if !self.store.compare_and_delete(&key, &raw).await? {
            return Err(KvError::invalid_token(
                resource,
                token,
                TokenRejection::Changed,
            ));
        }

        debug!(resource, %token, "lock released");
        Ok(())
    }

    async fn validate_token(&self, resource: &str, token: FencingToken) -> KvResult<bool> {
        let key = lock_key(resource);

        match self.store.get(&key).await? {
            Some(raw) => Ok(LockEntry::decode(&raw)?.token == token),
            None => Ok(false),
        }
    }
}
