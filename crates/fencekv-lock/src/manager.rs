//! Lock manager: acquire, run, always release
//!
//! `LockManager::execute_with_lock` wraps a unit of work so that it runs only
//! while the lock on a resource is held, receives the fencing token for that
//! hold, and is followed by a best-effort release under a deadline that is
//! independent of the caller.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use fencekv_common::{FencingToken, KvError, KvResult};

use crate::lock::{DEFAULT_LOCK_TTL, DistributedLock, FencedLock};
use crate::model::LockStats;
use crate::store::LockStore;

/// Default deadline for acquiring a lock
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for the cleanup release
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lock manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockManagerConfig {
    /// TTL of lock entries; should exceed the worst-case duration of the protected work
    pub lock_ttl: Duration,
    /// Deadline for acquisition
    pub acquire_timeout: Duration,
    /// Deadline for the release that follows the protected work
    pub release_timeout: Duration,
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        Self {
            lock_ttl: DEFAULT_LOCK_TTL,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        }
    }
}

#[derive(Default)]
struct LockStatsCollector {
    acquisitions: AtomicU64,
    contended: AtomicU64,
    acquire_timeouts: AtomicU64,
    transport_failures: AtomicU64,
    releases: AtomicU64,
    release_failures: AtomicU64,
}

impl LockStatsCollector {
    fn snapshot(&self) -> LockStats {
        LockStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            acquire_timeouts: self.acquire_timeouts.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
        }
    }
}

/// Runs work under a distributed lock
pub struct LockManager {
    lock: Arc<dyn DistributedLock>,
    acquire_timeout: Duration,
    release_timeout: Duration,
    stats: Arc<LockStatsCollector>,
}

impl LockManager {
    pub fn new(lock: Arc<dyn DistributedLock>) -> Self {
        Self {
            lock,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
            stats: Arc::new(LockStatsCollector::default()),
        }
    }

    /// Build a `FencedLock` over `store` with the configured TTL and wrap it
    pub fn from_store(store: Arc<dyn LockStore>, config: LockManagerConfig) -> Self {
        let lock = FencedLock::new(store).with_ttl(config.lock_ttl);
        Self::new(Arc::new(lock)).with_config(config)
    }

    /// Override the timeouts; zero durations keep the current value.
    ///
    /// `lock_ttl` belongs to the primitive and is only applied by `from_store`.
    pub fn with_config(mut self, config: LockManagerConfig) -> Self {
        if !config.acquire_timeout.is_zero() {
            self.acquire_timeout = config.acquire_timeout;
        }
        if !config.release_timeout.is_zero() {
            self.release_timeout = config.release_timeout;
        }
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn release_timeout(&self) -> Duration {
        self.release_timeout
    }

    pub fn stats(&self) -> LockStats {
        self.stats.snapshot()
    }

    /// Run `f` while holding the lock on `resource`.
    ///
    /// `f` receives the fencing token of this hold. Acquisition failures
    /// (`LockHeld`, `AcquireTimeout`, `Transport`) are returned without running
    /// `f`. Once `f` finishes, the lock is released regardless of its outcome;
    /// release failures are logged and never replace `f`'s result. If this
    /// future is dropped while the lock is held, the release is spawned onto the
    /// current runtime.
    pub async fn execute_with_lock<T, F, Fut>(&self, resource: &str, f: F) -> KvResult<T>
    where
        F: FnOnce(FencingToken) -> Fut,
        Fut: Future<Output = KvResult<T>>,
    {
        let token = self.acquire(resource).await?;

        let guard = ReleaseGuard::new(PendingRelease {
            lock: self.lock.clone(),
            resource: resource.to_string(),
            token,
            timeout: self.release_timeout,
            stats: self.stats.clone(),
        });

        let result = f(token).await;
        guard.release().await;
        result
    }

    /// Probe whether `token` still holds the lock on `resource`
    pub async fn validate_token(&self, resource: &str, token: FencingToken) -> KvResult<bool> {
        self.lock.validate_token(resource, token).await
    }

    async fn acquire(&self, resource: &str) -> KvResult<FencingToken> {
        match tokio::time::timeout(self.acquire_timeout, self.lock.acquire(resource)).await {
            Ok(Ok(token)) => {
                self.stats.acquisitions.fetch_add(1, Ordering::Relaxed);
                Ok(token)
            }
            Ok(Err(err)) => {
                match &err {
                    KvError::LockHeld { .. } => {
                        self.stats.contended.fetch_add(1, Ordering::Relaxed);
                    }
                    KvError::Transport(_) => {
                        self.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {}
                }
                debug!(resource, error = %err, "lock acquisition failed");
                Err(err)
            }
            Err(_) => {
                self.stats.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    resource,
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "lock acquisition timed out"
                );
                Err(KvError::AcquireTimeout {
                    resource: resource.to_string(),
                    timeout: self.acquire_timeout,
                })
            }
        }
    }
}

struct PendingRelease {
    lock: Arc<dyn DistributedLock>,
    resource: String,
    token: FencingToken,
    timeout: Duration,
    stats: Arc<LockStatsCollector>,
}

impl PendingRelease {
    async fn run(self) {
        let outcome =
            tokio::time::timeout(self.timeout, self.lock.release(&self.resource, self.token)).await;

        match outcome {
            Ok(Ok(())) => {
                self.stats.releases.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => {
                self.stats.release_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    resource = %self.resource,
                    token = %self.token,
                    error = %err,
                    "failed to release lock"
                );
            }
            Err(_) => {
                self.stats.release_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    resource = %self.resource,
                    token = %self.token,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "lock release timed out"
                );
            }
        }
    }
}

/// Releases the lock when dropped unless `release` already ran
struct ReleaseGuard {
    pending: Option<PendingRelease>,
}

impl ReleaseGuard {
    fn new(pending: PendingRelease) -> Self {
        Self {
            pending: Some(pending),
        }
    }

    async fn release(mut self) {
        if let Some(pending) = self.pending.take() {
            pending.run().await;
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(resource = %pending.resource, "caller dropped; releasing lock in background");
                handle.spawn(pending.run());
            }
            Err(_) => {
                warn!(
                    resource = %pending.resource,
                    token = %pending.token,
                    "no runtime to release lock; it will expire after its TTL"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLockStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    fn manager_over(store: Arc<MemoryLockStore>) -> LockManager {
        LockManager::from_store(store, LockManagerConfig::default())
    }

    #[tokio::test]
    async fn test_execute_passes_token_and_releases() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());

        let token = manager
            .execute_with_lock("k", |token| async move {
                assert_eq!(token, FencingToken::new(1));
                Ok(token)
            })
            .await
            .unwrap();

        assert_eq!(token, FencingToken::new(1));
        assert_eq!(store.live_entries(), 0);

        let stats = manager.stats();
        assert_eq!(stats.acquisitions, 1);
        assert_eq!(stats.releases, 1);
    }

    #[tokio::test]
    async fn test_work_error_is_returned_and_lock_released() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());

        let result: KvResult<()> = manager
            .execute_with_lock("k", |_| async { Err(KvError::NotFound("k".to_string())) })
            .await;

        assert_eq!(result, Err(KvError::NotFound("k".to_string())));
        assert_eq!(store.live_entries(), 0);
    }

    #[tokio::test]
    async fn test_held_lock_skips_work() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());
        let other = FencedLock::new(store.clone());
        other.acquire("k").await.unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let result = manager
            .execute_with_lock("k", move |_| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(KvError::lock_held("k")));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(manager.stats().contended, 1);
    }

    #[tokio::test]
    async fn test_release_failure_does_not_mask_result() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());

        let result = manager
            .execute_with_lock("k", |_| {
                let store = store.clone();
                async move {
                    store.set_unavailable(true);
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(manager.stats().release_failures, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_on_acquire() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());
        store.set_unavailable(true);

        let result = manager.execute_with_lock("k", |_| async { Ok(()) }).await;

        assert!(matches!(result, Err(KvError::Transport(_))));
        assert_eq!(manager.stats().transport_failures, 1);
    }

    /// Lock whose acquisition never completes in time
    struct StalledLock;

    #[async_trait]
    impl DistributedLock for StalledLock {
        async fn acquire(&self, _resource: &str) -> KvResult<FencingToken> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(FencingToken::new(1))
        }

        async fn release(&self, _resource: &str, _token: FencingToken) -> KvResult<()> {
            Ok(())
        }

        async fn validate_token(&self, _resource: &str, _token: FencingToken) -> KvResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout_is_distinct_error() {
        let manager = LockManager::new(Arc::new(StalledLock)).with_config(LockManagerConfig {
            acquire_timeout: Duration::from_millis(100),
            ..Default::default()
        });

        let result = manager.execute_with_lock("slow", |_| async { Ok(()) }).await;

        assert_eq!(
            result,
            Err(KvError::AcquireTimeout {
                resource: "slow".to_string(),
                timeout: Duration::from_millis(100),
            })
        );
        assert_eq!(manager.stats().acquire_timeouts, 1);
    }

    #[tokio::test]
    async fn test_dropped_caller_still_releases() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = manager_over(store.clone());

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            manager.execute_with_lock("k", |_| std::future::pending::<KvResult<()>>()),
        )
        .await;
        assert!(cancelled.is_err());

        // Background release runs once the runtime gets a chance
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.live_entries(), 0);
        assert_eq!(manager.stats().releases, 1);
    }

    #[test]
    fn test_zero_overrides_keep_defaults() {
        let manager = LockManager::new(Arc::new(StalledLock)).with_config(LockManagerConfig {
            lock_ttl: Duration::ZERO,
            acquire_timeout: Duration::ZERO,
            release_timeout: Duration::from_secs(1),
        });

        assert_eq!(manager.acquire_timeout(), DEFAULT_ACQUIRE_TIMEOUT);
        assert_eq!(manager.release_timeout(), Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_resource_work_never_overlaps() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = Arc::new(manager_over(store));
        let inside = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let manager = manager.clone();
            let inside = inside.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .execute_with_lock("shared", |_| async move {
                        assert!(!inside.swap(true, Ordering::SeqCst));
                        tokio::task::yield_now().await;
                        inside.store(false, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }

        let mut completed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => completed += 1,
                Err(err) => assert!(err.is_retryable()),
            }
        }
        assert!(completed >= 1);
    }
}
