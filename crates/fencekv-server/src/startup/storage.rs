//! Backend selection

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fencekv_lock::{LockManager, RedisLockStore};
use fencekv_storage::{KvStore, LockedStore, MemoryStore, RedisStore, StorageType};

use crate::model::config::Configuration;

/// Build the store the HTTP API serves.
///
/// `memory` is a plain process-local map. `redis` wraps the Redis value store
/// in a `LockedStore` whose locks live on the same Redis connection.
pub async fn create_storage(configuration: &Configuration) -> anyhow::Result<Arc<dyn KvStore>> {
    match configuration.storage_type()? {
        StorageType::Memory => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageType::Redis => {
            let addr = configuration.redis_addr();
            let store = RedisStore::connect(&configuration.redis_url())
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", addr))?;

            let lock_config = configuration.lock_manager_config();
            let lock_store = Arc::new(RedisLockStore::new(store.connection()));
            let lock_manager = Arc::new(LockManager::from_store(lock_store, lock_config));

            let verify_ownership = configuration.lock_verify_ownership();
            info!(
                redis = %addr,
                lock_ttl_ms = lock_config.lock_ttl.as_millis() as u64,
                acquire_timeout_ms = lock_config.acquire_timeout.as_millis() as u64,
                verify_ownership,
                "Using Redis storage with fencing-token locks"
            );

            Ok(Arc::new(
                LockedStore::new(Arc::new(store), lock_manager)
                    .with_verify_ownership(verify_ownership),
            ))
        }
    }
}
