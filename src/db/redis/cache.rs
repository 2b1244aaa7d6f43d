use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

/// Keys for cached metadata lookups, normalized on the lowercased title
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Poster(String),
    Trailer(String),
    Details(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Poster(title) => write!(f, "poster:{}", title.to_lowercase()),
            CacheKey::Trailer(title) => write!(f, "trailer:{}", title.to_lowercase()),
            CacheKey::Details(title) => write!(f, "details:{}", title.to_lowercase()),
        }
    }
}

/// Creates a Redis client for caching
///
/// Opening the client does not connect; the first lookup does.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Queued write for the background writer
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Outcome of a cache writer's lifetime, reported on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheWriterStats {
    pub written: usize,
    pub failed: usize,
}

/// Redis-backed cache for metadata lookups.
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// lookup never waits on the cache.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Stops the background writer once queued writes are flushed
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<CacheWriterStats>,
}

impl CacheWriterHandle {
    /// Signals the writer, then waits until every write queued so far has
    /// been attempted.
    ///
    /// Writes queued after this call are dropped, even if some `Cache` clone
    /// is still alive.
    pub async fn shutdown(self) -> CacheWriterStats {
        let _ = self.shutdown_tx.send(()).await;

        match self.task.await {
            Ok(stats) => {
                tracing::info!(written = stats.written, failed = stats.failed, "Cache writer flushed");
                stats
            }
            Err(e) => {
                tracing::error!(error = %e, "Cache writer task panicked");
                CacheWriterStats::default()
            }
        }
    }
}

/// Background writer state; holds one connection and reopens it after a failure
struct CacheWriter {
    client: Client,
    conn: Option<MultiplexedConnection>,
    stats: CacheWriterStats,
}

impl CacheWriter {
    async fn run(
        mut self,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> CacheWriterStats {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                biased;
                // A dropped handle stops the writer too.
                _ = shutdown_rx.recv() => break,
                msg = write_rx.recv() => match msg {
                    Some(msg) => self.write(msg).await,
                    None => break,
                },
            }
        }

        // Drain without waiting on senders that may outlive the handle.
        while let Ok(msg) = write_rx.try_recv() {
            self.write(msg).await;
        }

        self.stats
    }

    async fn write(&mut self, msg: CacheWriteMessage) {
        let key = msg.key.clone();
        match self.try_write(msg).await {
            Ok(()) => self.stats.written += 1,
            Err(e) => {
                self.stats.failed += 1;
                tracing::error!(error = %e, key = %key, "Failed to write to Redis cache");
            }
        }
    }

    async fn try_write(&mut self, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.client.get_multiplexed_async_connection().await?,
        };
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        self.conn = Some(conn);
        Ok(())
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = CacheWriter {
            client: redis_client.clone(),
            conn: None,
            stats: CacheWriterStats::default(),
        };
        let task = tokio::spawn(writer.run(write_rx, shutdown_rx));

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    /// Cached value for `key`, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a write; serialization failures are logged and the value skipped
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if self.write_tx.send(msg).is_err() {
            tracing::warn!(key = %key, "Cache writer already stopped, dropping write");
        }
    }
}
