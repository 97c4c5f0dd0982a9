//! In-process backing store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use fencekv_common::{KvError, KvResult};

use crate::traits::KvStore;

/// Map-backed store for a single process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn save(&self, key: &str, value: Value) -> KvResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> KvResult<Value> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        match self.values.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(KvError::NotFound(key.to_string())),
        }
    }
}
