//! Redis key-value record store.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client as RedisClient};
use tracing::{debug, info};

use crate::storage::{KeyValueEntry, RecordStore, StorageError};

pub struct RedisRecordStore {
    connection: MultiplexedConnection,
}

impl RedisRecordStore {
    pub async fn connect(client: &RedisClient) -> Result<Self, StorageError> {
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        info!("Redis record store connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut con = self.connection.clone();
        con.set::<_, _, ()>(key, value).await.map_err(transport)?;
        debug!(key = %key, "Record written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut con = self.connection.clone();
        con.get::<_, Option<String>>(key).await.map_err(transport)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValueEntry>, StorageError> {
        let mut con = self.connection.clone();
        let pattern = format!("{prefix}*");

        let keys: Vec<String> = {
            let mut iter = con.scan_match::<_, String>(&pattern).await.map_err(transport)?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            // A key can expire between SCAN and GET; skip it rather than fail
            // the whole listing.
            if let Some(value) = con
                .get::<_, Option<String>>(&key)
                .await
                .map_err(transport)?
            {
                entries.push(KeyValueEntry { key, value });
            }
        }
        Ok(entries)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut con = self.connection.clone();
        con.del::<_, ()>(key).await.map_err(transport)?;
        debug!(key = %key, "Record deleted");
        Ok(())
    }
}

fn transport(e: redis::RedisError) -> StorageError {
    StorageError::Transport(format!("redis: {e}"))
}
