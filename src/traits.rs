//! Core ModelResolver trait

use async_trait::async_trait;

use crate::Result;
use crate::types::Model;

/// The surface the request path and administrative flows depend on.
///
/// Implemented by [`ModelService`](crate::ModelService); collaborators
/// hold it as `Arc<dyn ModelResolver>` so tests can substitute their own.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    /// Resolve the model a caller may use for `requested`.
    ///
    /// Fails with [`ModelNotFound`](crate::HuginnError::ModelNotFound) or
    /// [`ModelDisabled`](crate::HuginnError::ModelDisabled) when the
    /// permission cascade rejects the request.
    async fn resolve(&self, requested: &str, user_id: i64, app_id: i64, key: &str) -> Result<Model>;

    /// Follow `model`'s forwarding rules for `prompt`.
    async fn resolve_target(&self, model: Model, prompt: &str) -> Result<Model>;

    /// The active model with canonical identifier `model`, straight from the store.
    async fn get_model(&self, model: &str) -> Result<Model>;

    /// A model by id from the cache tiers only.
    async fn get_cache_model(&self, id: &str) -> Result<Model>;

    /// Write models to both cache tiers.
    async fn save_cache_list(&self, models: &[Model]) -> Result<()>;

    /// Evict a model from both cache tiers. Shared-tier failures are logged.
    async fn remove_cache_model(&self, id: &str) -> Result<()>;
}
