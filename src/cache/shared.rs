//! In-memory [`SharedCache`] backend.
//!
//! Shared only between handles in one process (clone the `Arc`). Stands in
//! for the network tier in tests and single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SharedCache;
use crate::Result;

type Hash = HashMap<String, String>;

#[derive(Default)]
pub struct MemorySharedCache {
    hashes: RwLock<HashMap<String, Hash>>,
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, for inspection.
    pub async fn raw(&self, namespace: &str, field: &str) -> Option<String> {
        self.hashes
            .read()
            .await
            .get(namespace)
            .and_then(|h| h.get(field))
            .cloned()
    }

    /// Store a raw value, bypassing serialization.
    pub async fn set_raw(&self, namespace: &str, field: &str, value: impl Into<String>) {
        self.hashes
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }
}

#[async_trait]
impl SharedCache for MemorySharedCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn hset(&self, namespace: &str, fields: &[(String, String)]) -> Result<()> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(namespace.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hmget(&self, namespace: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        let hashes = self.hashes.read().await;
        let hash = hashes.get(namespace);
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f)).cloned())
            .collect())
    }

    async fn hdel(&self, namespace: &str, field: &str) -> Result<()> {
        if let Some(hash) = self.hashes.write().await.get_mut(namespace) {
            hash.remove(field);
        }
        Ok(())
    }
}
