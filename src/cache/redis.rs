//! Redis-backed [`SharedCache`].
//!
//! Models live in one Redis hash per namespace (`HSET`/`HMGET`/`HDEL`).
//! All commands share one [`ConnectionManager`], opened on first use and
//! reconnected by redis-rs after a dropped connection.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::SharedCache;
use crate::Result;

#[derive(Clone)]
pub struct RedisSharedCache {
    client: redis::Client,
    conn: Arc<OnceCell<ConnectionManager>>,
}

impl std::fmt::Debug for RedisSharedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSharedCache")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl RedisSharedCache {
    /// Create a cache for the given `redis://` URL. Does not connect yet.
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url.as_ref())?,
            conn: Arc::new(OnceCell::new()),
        })
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    /// Handle to the shared connection; clones are cheap and multiplexed.
    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(conn.clone())
    }

    /// Round-trip check against the server.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl SharedCache for RedisSharedCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn hset(&self, namespace: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: () = conn.hset_multiple(namespace, fields).await?;
        Ok(())
    }

    async fn hmget(&self, namespace: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        // Explicit HMGET so a single field still yields an array reply.
        let values: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(namespace)
            .arg(fields)
            .query_async(&mut conn)
            .await?;
        Ok(values)
    }

    async fn hdel(&self, namespace: &str, field: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.hdel(namespace, field).await?;
        Ok(())
    }
}
