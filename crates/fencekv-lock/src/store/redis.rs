//! Redis-backed lock store shared by every fencekv process.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use fencekv_common::{KvError, KvResult};

use super::LockStore;

/// GET + compare + DEL must run as one server-side step; a lock acquired by a
/// third party between the read and the delete must survive.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Lock store on a Redis (or Redis-compatible) server
pub struct RedisLockStore {
    connection: MultiplexedConnection,
    compare_and_delete: redis::Script,
}

impl RedisLockStore {
    /// Share an existing multiplexed connection (e.g. the one used by the value store)
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self {
            connection,
            compare_and_delete: redis::Script::new(COMPARE_AND_DELETE_SCRIPT),
        }
    }

    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = redis::Client::open(url).map_err(KvError::transport)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::transport)?;
        Ok(Self::new(connection))
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn increment(&self, counter: &str) -> KvResult<i64> {
        let mut conn = self.connection.clone();
        let value: i64 = redis::cmd("INCR")
            .arg(counter)
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(value)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool> {
        let mut conn = self.connection.clone();
        // PX rejects 0, so sub-millisecond TTLs round up
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(value)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> KvResult<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(deleted > 0)
    }
}
