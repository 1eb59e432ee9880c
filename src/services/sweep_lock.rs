use std::time::Duration;

use uuid::Uuid;

const LOCK_PREFIX: &str = "valet_dispatch:sweep:";

/// Deletes the key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis lease that keeps a periodic sweep to one replica at a time.
pub struct SweepLock {
    client: redis::Client,
}

/// Proof of a held lease; pass back to [`SweepLock::release`].
#[derive(Debug)]
pub struct LeaseGuard {
    key: String,
    token: String,
}

impl SweepLock {
    pub fn new(redis_url: &str) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url).map_err(LockError::Redis)?;
        Ok(Self { client })
    }

    /// Try to take the lease for `sweep`. `None` when another replica holds it.
    pub async fn try_acquire(
        &self,
        sweep: &str,
        ttl: Duration,
    ) -> Result<Option<LeaseGuard>, LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(LockError::Redis)?;
        let key = format!("{LOCK_PREFIX}{sweep}");
        let token = Uuid::new_v4().to_string();

        let acquired: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(LockError::Redis)?;

        Ok(acquired.map(|_| LeaseGuard { key, token }))
    }

    /// Give the lease back early. A lease that already expired is left alone.
    pub async fn release(&self, guard: LeaseGuard) -> Result<bool, LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(LockError::Redis)?;
        let deleted: i64 = redis::cmd("EVAL")
            .arg(RELEASE_SCRIPT)
            .arg(1)
            .arg(&guard.key)
            .arg(&guard.token)
            .query_async(&mut conn)
            .await
            .map_err(LockError::Redis)?;
        Ok(deleted == 1)
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(LockError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(LockError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
