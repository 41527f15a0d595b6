//! In-memory store and account source.
//!
//! Useful for tests, single-process deployments, and as the reference
//! behaviour for other backends. Administrative mutations on
//! [`MemoryModelStore`] publish exactly one change event each onto an
//! attached channel, the same contract a production store's change
//! notifier follows.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::{AccountSource, ModelFilter, ModelSort, ModelStore};
use crate::feed::{ChangeAction, ChangeEvent};
use crate::types::{App, Key, ModelRecord, ModelStatus, User};
use crate::{HuginnError, Result};

/// Model store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryModelStore {
    records: RwLock<HashMap<String, ModelRecord>>,
    changes: Option<UnboundedSender<String>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed initial documents. Seeding does not publish change events.
    pub fn with_records(mut self, records: impl IntoIterator<Item = ModelRecord>) -> Self {
        let map = self.records.get_mut();
        for record in records {
            map.insert(record.id().to_string(), record);
        }
        self
    }

    /// Publish a serialized [`ChangeEvent`] for every subsequent mutation.
    pub fn with_change_feed(mut self, sender: UnboundedSender<String>) -> Self {
        self.changes = Some(sender);
        self
    }

    /// Insert or replace a document, publishing an `update` event.
    pub async fn upsert(&self, mut record: ModelRecord) -> Result<()> {
        if record.updated_at == 0 {
            record.updated_at = now_millis();
        }
        let old = self
            .records
            .write()
            .await
            .insert(record.id().to_string(), record.clone());
        self.publish(ChangeAction::Update, old, Some(record))
    }

    /// Change a document's status, publishing a `status` event.
    pub async fn set_status(&self, id: &str, status: ModelStatus) -> Result<()> {
        let (old, new) = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(id)
                .ok_or_else(|| HuginnError::ModelNotFound(id.to_string()))?;
            let old = record.clone();
            record.model.status = status;
            record.updated_at = now_millis().max(old.updated_at + 1);
            (old, record.clone())
        };
        self.publish(ChangeAction::Status, Some(old), Some(new))
    }

    /// Remove a document, publishing a `delete` event if it existed.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let old = self.records.write().await.remove(id);
        match old {
            Some(old) => self.publish(ChangeAction::Delete, Some(old), None),
            None => Ok(()),
        }
    }

    fn publish(
        &self,
        action: ChangeAction,
        old_data: Option<ModelRecord>,
        new_data: Option<ModelRecord>,
    ) -> Result<()> {
        let Some(sender) = &self.changes else {
            return Ok(());
        };
        let payload = serde_json::to_string(&ChangeEvent {
            action,
            old_data,
            new_data,
        })?;
        if sender.send(payload).is_err() {
            debug!(action = %action, "change feed receiver dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl ModelStore for MemoryModelStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_one(&self, filter: &ModelFilter) -> Result<Option<ModelRecord>> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| filter.matches(r)).cloned())
    }

    async fn find_many(&self, filter: &ModelFilter, sort: ModelSort) -> Result<Vec<ModelRecord>> {
        let records = self.records.read().await;
        let mut found: Vec<ModelRecord> =
            records.values().filter(|r| filter.matches(r)).cloned().collect();
        match sort {
            ModelSort::UpdatedAtDesc => found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            ModelSort::UpdatedAtAsc => found.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        }
        Ok(found)
    }
}

/// Account source backed by `HashMap`s.
#[derive(Default)]
pub struct MemoryAccounts {
    users: RwLock<HashMap<i64, User>>,
    apps: RwLock<HashMap<i64, App>>,
    keys: RwLock<HashMap<String, Key>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.get_mut().insert(user.user_id, user);
        self
    }

    pub fn with_app(mut self, app: App) -> Self {
        self.apps.get_mut().insert(app.app_id, app);
        self
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.keys.get_mut().insert(key.key.clone(), key);
        self
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.user_id, user);
    }

    pub async fn insert_app(&self, app: App) {
        self.apps.write().await.insert(app.app_id, app);
    }

    pub async fn insert_key(&self, key: Key) {
        self.keys.write().await.insert(key.key.clone(), key);
    }
}

#[async_trait]
impl AccountSource for MemoryAccounts {
    async fn user(&self, user_id: i64) -> Result<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| HuginnError::AccountNotFound {
                kind: "user",
                id: user_id.to_string(),
            })
    }

    async fn app(&self, app_id: i64) -> Result<App> {
        self.apps
            .read()
            .await
            .get(&app_id)
            .cloned()
            .ok_or_else(|| HuginnError::AccountNotFound {
                kind: "app",
                id: app_id.to_string(),
            })
    }

    async fn key(&self, secret: &str) -> Result<Key> {
        self.keys
            .read()
            .await
            .get(secret)
            .cloned()
            .ok_or_else(|| HuginnError::AccountNotFound {
                kind: "key",
                // Never echo the secret itself.
                id: "<redacted>".to_string(),
            })
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
