use async_trait::async_trait;
use bookit_core::repository::ExpiringStore;
use bookit_core::{StoreError, StoreResult};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Cooldown keys and other short-lived state.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::backend)
    }
}

#[async_trait]
impl ExpiringStore for RedisClient {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key).await.map_err(StoreError::backend)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        // SET EX rejects zero
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(StoreError::backend)?;
        debug!("Expiring key set: {} ({}s)", key, seconds);
        Ok(())
    }
}
