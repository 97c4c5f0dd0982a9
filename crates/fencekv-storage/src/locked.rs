//! Fencing-token guarded store
//!
//! `LockedStore` runs every operation under the distributed lock for its key
//! and remembers, per key, the highest fencing token that completed an
//! operation. A holder whose token is not newer than that record is refused
//! before the backing store is touched, so a client that stalled past its
//! lock TTL cannot overwrite work done by a later holder.
//!
//! The record lives in this process only; it fences writers that go through
//! the same `LockedStore` instance.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use fencekv_common::{FencingToken, KvError, KvResult, TokenRejection};
use fencekv_lock::LockManager;

use crate::traits::KvStore;

pub struct LockedStore {
    store: Arc<dyn KvStore>,
    lock_manager: Arc<LockManager>,
    last_processed: RwLock<HashMap<String, FencingToken>>,
    verify_ownership: bool,
}

impl LockedStore {
    pub fn new(store: Arc<dyn KvStore>, lock_manager: Arc<LockManager>) -> Self {
        Self {
            store,
            lock_manager,
            last_processed: RwLock::new(HashMap::new()),
            verify_ownership: false,
        }
    }

    /// Re-check that the lock entry still holds the token right before
    /// save and delete commit
    pub fn with_verify_ownership(mut self, verify: bool) -> Self {
        self.verify_ownership = verify;
        self
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Highest token that completed an operation on `key`
    pub fn last_processed_token(&self, key: &str) -> Option<FencingToken> {
        self.last_processed.read().get(key).copied()
    }

    fn ensure_fresh(&self, key: &str, token: FencingToken) -> KvResult<()> {
        let last = self.last_processed.read().get(key).copied();

        match last {
            Some(last_processed) if !token.is_newer_than(last_processed) => {
                warn!(key, %token, %last_processed, "rejecting stale fencing token");
                Err(KvError::invalid_token(
                    key,
                    token,
                    TokenRejection::Stale { last_processed },
                ))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_owned(&self, key: &str, token: FencingToken) -> KvResult<()> {
        if !self.verify_ownership {
            return Ok(());
        }

        if !self.lock_manager.validate_token(key, token).await? {
            warn!(key, %token, "lock expired before commit");
            return Err(KvError::invalid_token(key, token, TokenRejection::Expired));
        }
        Ok(())
    }

    fn record_token(&self, key: &str, token: FencingToken) {
        let mut last_processed = self.last_processed.write();
        match last_processed.get_mut(key) {
            Some(current) if !token.is_newer_than(*current) => {}
            Some(current) => *current = token,
            None => {
                last_processed.insert(key.to_string(), token);
            }
        }
    }

    fn forget_token(&self, key: &str) {
        self.last_processed.write().remove(key);
    }
}

#[async_trait]
impl KvStore for LockedStore {
    async fn save(&self, key: &str, value: Value) -> KvResult<()> {
        self.lock_manager
            .execute_with_lock(key, |token| async move {
                self.ensure_fresh(key, token)?;
                self.ensure_owned(key, token).await?;

                self.store.save(key, value).await?;
                self.record_token(key, token);

                debug!(key, %token, "saved");
                Ok(())
            })
            .await
    }

    async fn retrieve(&self, key: &str) -> KvResult<Value> {
        self.lock_manager
            .execute_with_lock(key, |token| async move {
                self.ensure_fresh(key, token)?;

                let value = self.store.retrieve(key).await?;
                self.record_token(key, token);

                Ok(value)
            })
            .await
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        self.lock_manager
            .execute_with_lock(key, |token| async move {
                self.ensure_fresh(key, token)?;
                self.ensure_owned(key, token).await?;

                self.store.delete(key).await?;
                self.forget_token(key);

                debug!(key, %token, "deleted");
                Ok(())
            })
            .await
    }
}
