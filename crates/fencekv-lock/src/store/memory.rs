//! In-process lock store.
//! Serves single-process deployments and stands in for the shared store in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use fencekv_common::{KvError, KvResult};

use super::LockStore;

struct Slot {
    value: String,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// DashMap-backed lock store with lazy TTL expiry.
///
/// Expiry is measured with `tokio::time::Instant`, so tests running on a
/// paused clock can advance past a TTL without sleeping.
#[derive(Default)]
pub struct MemoryLockStore {
    entries: DashMap<String, Slot>,
    counters: DashMap<String, i64>,
    unavailable: AtomicBool,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every operation fails with `Transport` while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live (unexpired) entries
    pub fn live_entries(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    fn ensure_available(&self) -> KvResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvError::transport("memory lock store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn increment(&self, counter: &str) -> KvResult<i64> {
        self.ensure_available()?;

        let mut value = self.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool> {
        self.ensure_available()?;

        let now = Instant::now();
        let slot = Slot {
            value: value.to_string(),
            expires_at: now + ttl,
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(slot);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.ensure_available()?;

        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .and_then(|slot| (!slot.is_expired(now)).then(|| slot.value.clone()));

        if live.is_none() {
            self.entries.remove_if(key, |_, slot| slot.is_expired(now));
        }

        Ok(live)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> KvResult<bool> {
        self.ensure_available()?;

        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, slot| !slot.is_expired(now) && slot.value == expected);

        Ok(removed.is_some())
    }
}
