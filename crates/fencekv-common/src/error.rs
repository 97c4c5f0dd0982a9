//! Error types for fencekv
//!
//! This module defines:
//! - `KvError`: the tagged error enum shared by the lock, storage and server layers
//! - `TokenRejection`: why a fencing token was refused

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::token::FencingToken;

pub type KvResult<T> = Result<T, KvError>;

/// Errors surfaced by the fenced key-value layer.
///
/// Lock contention, staleness and "no such key" are distinct variants so that
/// callers can decide whether to retry without comparing messages.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    #[error("lock already held for resource '{resource}'")]
    LockHeld { resource: String },

    #[error("timed out after {timeout:?} acquiring lock for resource '{resource}'")]
    AcquireTimeout { resource: String, timeout: Duration },

    #[error("fencing token {token} rejected for resource '{resource}': {reason}")]
    InvalidToken {
        resource: String,
        token: FencingToken,
        reason: TokenRejection,
    },

    #[error("key '{0}' not found")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl KvError {
    pub fn lock_held(resource: impl Into<String>) -> Self {
        KvError::LockHeld {
            resource: resource.into(),
        }
    }

    pub fn invalid_token(
        resource: impl Into<String>,
        token: FencingToken,
        reason: TokenRejection,
    ) -> Self {
        KvError::InvalidToken {
            resource: resource.into(),
            token,
            reason,
        }
    }

    pub fn transport(message: impl Display) -> Self {
        KvError::Transport(message.to_string())
    }

    /// Contention errors: the caller may back off and try again with a fresh acquisition
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KvError::LockHeld { .. } | KvError::AcquireTimeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound(_))
    }

    pub fn is_invalid_token(&self) -> bool {
        matches!(self, KvError::InvalidToken { .. })
    }
}

impl From<serde_json::Error> for KvError {
    fn from(value: serde_json::Error) -> Self {
        KvError::Transport(format!("malformed payload: {}", value))
    }
}

/// Reason a fencing token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// The live lock entry carries a different token
    Mismatch { current: FencingToken },
    /// The entry changed between the ownership read and the atomic delete
    Changed,
    /// A token at least as new has already completed an operation on the key
    Stale { last_processed: FencingToken },
    /// The lock entry expired before the operation could commit
    Expired,
}

impl Display for TokenRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenRejection::Mismatch { current } => {
                write!(f, "lock is now held with token {}", current)
            }
            TokenRejection::Changed => write!(f, "lock entry changed before release"),
            TokenRejection::Stale { last_processed } => {
                write!(f, "token {} already processed", last_processed)
            }
            TokenRejection::Expired => write!(f, "lock expired before commit"),
        }
    }
}
