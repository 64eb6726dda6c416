use std::fmt::Display;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::models::RecommendationType;

/// Cache key namespaces, one per cached artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A generated recommendation set for (user, type)
    Recommendations(String, RecommendationType),
    /// A built prompt for (user, type)
    Prompt(String, RecommendationType),
    /// A fetched user data bundle
    UserData(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(user_id, rec_type) => {
                write!(f, "recommendations:{}_{}", user_id, rec_type)
            }
            CacheKey::Prompt(user_id, rec_type) => write!(f, "prompt:{}_{}", user_id, rec_type),
            CacheKey::UserData(user_id) => write!(f, "user_data:{}", user_id),
        }
    }
}

/// Key/value store with TTL, injected into the orchestrator and the ranking
/// engine.
///
/// Values are JSON strings; [`get_json`] and [`put_json`] add typing on top.
/// Every write is a single atomic key-set with TTL, so readers never observe
/// partial state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>>;

    /// Awaited write; failure is observable by the caller
    async fn set(&self, key: &CacheKey, value: String, ttl: u64) -> AppResult<()>;

    /// Fire-and-forget write for best-effort side caching
    fn set_in_background(&self, key: &CacheKey, value: String, ttl: u64);

    async fn delete(&self, key: &CacheKey) -> AppResult<()>;
}

/// Reads a cached value and deserializes it
pub async fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn CacheStore,
    key: &CacheKey,
) -> AppResult<Option<T>> {
    match store.get(key).await? {
        Some(json) => {
            let data = serde_json::from_str(&json)
                .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

/// Serializes a value and writes it with the given TTL
pub async fn put_json<T: serde::Serialize + Sync>(
    store: &dyn CacheStore,
    key: &CacheKey,
    value: &T,
    ttl: u64,
) -> AppResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;
    store.set(key, json, ttl).await
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed [`CacheStore`] with an async write background task
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl RedisCache {
    /// Creates a new cache instance and spawns the background write task,
    /// so best-effort writes never block pipeline stages.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    ///
    /// Continuously receives cache write requests from the channel and writes
    /// them to Redis. On shutdown signal, flushes all remaining messages
    /// before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), value, ttl).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis set failed");
            e
        })?;
        tracing::debug!(key = %key, ttl = ttl, "Cached value");
        Ok(())
    }

    fn set_in_background(&self, key: &CacheKey, value: String, ttl: u64) {
        let msg = CacheWriteMessage {
            key: key.to_string(),
            value,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }

    async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }
}
