//! Distributed lock data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fencekv_common::{FencingToken, KvResult};

/// Lock entry persisted under `lock:<resource>` while the lock is held
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Fencing token minted for this acquisition
    pub token: FencingToken,
    /// Acquiring process (`<hostname>-<pid>`), informational only
    pub server_id: String,
    /// Acquisition time
    pub acquired_at: DateTime<Utc>,
}

impl LockEntry {
    pub fn new(token: FencingToken, server_id: impl Into<String>) -> Self {
        Self {
            token,
            server_id: server_id.into(),
            acquired_at: Utc::now(),
        }
    }

    pub fn encode(&self) -> KvResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> KvResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Lock statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStats {
    /// Successful acquisitions
    pub acquisitions: u64,
    /// Acquisitions refused because another holder owned the resource
    pub contended: u64,
    /// Acquisitions abandoned at the acquire deadline
    pub acquire_timeouts: u64,
    /// Acquisitions that failed on the shared store
    pub transport_failures: u64,
    /// Releases that completed
    pub releases: u64,
    /// Releases that failed or timed out (suppressed)
    pub release_failures: u64,
}

/// Identify this process as `<hostname>-<pid>`
pub fn default_holder_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}", host, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_roundtrip_keeps_fields() {
        let entry = LockEntry::new(FencingToken::new(7), "node-a-1");
        let raw = entry.encode().unwrap();

        assert!(raw.contains("\"token\":7"));
        assert!(raw.contains("\"server_id\":\"node-a-1\""));
        assert_eq!(LockEntry::decode(&raw).unwrap(), entry);
    }

    #[test]
    fn test_decode_garbage_is_transport_error() {
        let err = LockEntry::decode("not json").unwrap_err();
        assert!(matches!(err, fencekv_common::KvError::Transport(_)));
    }

    #[test]
    fn test_default_holder_id_has_pid_suffix() {
        let id = default_holder_id();
        assert!(id.ends_with(&format!("-{}", std::process::id())));
    }
}
