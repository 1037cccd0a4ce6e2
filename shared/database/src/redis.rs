use anyhow::{Context, Result};
use redis::{aio::ConnectionManager, Client};

pub type RedisPool = ConnectionManager;

pub async fn create_redis_pool(redis_url: &str) -> Result<RedisPool> {
    let client = Client::open(redis_url).context("Invalid Redis URL")?;
    let connection_manager = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis cache");
    Ok(connection_manager)
}

pub async fn health_check(pool: &RedisPool) -> Result<()> {
    let mut con = pool.clone();
    let _: String = redis::cmd("PING")
        .query_async(&mut con)
        .await
        .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))?;
    Ok(())
}
