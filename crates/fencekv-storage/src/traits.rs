//! Backing store contract

use async_trait::async_trait;
use serde_json::Value;

use fencekv_common::KvResult;

/// A key-value store holding arbitrary JSON values.
///
/// `retrieve` and `delete` fail with `KvError::NotFound` for absent keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn save(&self, key: &str, value: Value) -> KvResult<()>;

    async fn retrieve(&self, key: &str) -> KvResult<Value>;

    async fn delete(&self, key: &str) -> KvResult<()>;
}
