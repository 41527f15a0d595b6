//! Authoritative sources: the model document store and account lookups.
//!
//! Both are consulted only on a full cache miss (models) or once per
//! resolution (accounts). Implementations handle their own concurrency;
//! every method may block on the network and is not cancellable mid-flight.

mod memory;

pub use memory::{MemoryAccounts, MemoryModelStore};

use async_trait::async_trait;

use crate::Result;
use crate::types::{App, Key, ModelRecord, ModelStatus, User};

/// Filter over model documents.
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelFilter {
    /// Canonical model identifier.
    pub model: Option<String>,
    /// Id set membership.
    pub ids: Option<Vec<String>>,
    pub status: Option<ModelStatus>,
}

impl ModelFilter {
    pub fn by_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn by_ids(ids: &[String]) -> Self {
        Self {
            ids: Some(ids.to_vec()),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: ModelStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether `record` satisfies every set field.
    pub fn matches(&self, record: &ModelRecord) -> bool {
        let model = &record.model;
        self.model.as_ref().is_none_or(|m| *m == model.model)
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&model.id))
            && self.status.is_none_or(|s| s == model.status)
    }
}

/// Result ordering for [`ModelStore::find_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSort {
    /// Most recently updated first.
    #[default]
    UpdatedAtDesc,
    UpdatedAtAsc,
}

/// Query interface of the authoritative model store.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// First document matching `filter`, if any.
    async fn find_one(&self, filter: &ModelFilter) -> Result<Option<ModelRecord>>;

    /// All documents matching `filter`, in `sort` order.
    async fn find_many(&self, filter: &ModelFilter, sort: ModelSort) -> Result<Vec<ModelRecord>>;
}

/// Lookup of the accounts that carry model permissions.
///
/// Missing accounts are reported as
/// [`HuginnError::AccountNotFound`](crate::HuginnError::AccountNotFound).
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn user(&self, user_id: i64) -> Result<User>;

    async fn app(&self, app_id: i64) -> Result<App>;

    /// Look up a key by the secret presented with the request.
    async fn key(&self, secret: &str) -> Result<Key>;
}
