//! Redis backing store
//!
//! Values are stored as JSON text under `kv:<key>`, apart from the lock
//! entries and the token counter that share the server.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde_json::Value;
use tracing::info;

use fencekv_common::{KvError, KvResult, value_key};

use crate::traits::KvStore;

/// Store on a Redis (or Redis-compatible) server
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `url` and check the server answers PING
    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = redis::Client::open(url).map_err(KvError::transport)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::transport)?;

        let store = Self { connection };
        store.ping().await?;
        info!("connected to redis");
        Ok(store)
    }

    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn ping(&self) -> KvResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(())
    }

    /// The multiplexed connection, for sharing with a lock store
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn save(&self, key: &str, value: Value) -> KvResult<()> {
        let data = serde_json::to_string(&value)?;
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(value_key(key))
            .arg(data)
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> KvResult<Value> {
        let mut conn = self.connection.clone();
        let data: Option<String> = redis::cmd("GET")
            .arg(value_key(key))
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;

        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Err(KvError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut conn = self.connection.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(value_key(key))
            .query_async(&mut conn)
            .await
            .map_err(KvError::transport)?;

        if removed == 0 {
            return Err(KvError::NotFound(key.to_string()));
        }
        Ok(())
    }
}
