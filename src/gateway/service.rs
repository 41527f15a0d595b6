//! ModelService - the assembled resolution engine

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::cache::CacheCoordinator;
use crate::feed::ChangeFeedSubscriber;
use crate::resolver::{ForwardResolver, PermissionResolver};
use crate::store::{ModelFilter, ModelStore};
use crate::types::{Model, ModelStatus};
use crate::{HuginnError, ModelResolver, Result};

/// Resolves, forwards and caches models for the request path.
///
/// Built with [`Huginn::builder`](super::Huginn::builder). Cheap to share
/// behind an `Arc`; every method takes `&self`.
pub struct ModelService {
    cache: Arc<CacheCoordinator>,
    store: Arc<dyn ModelStore>,
    permissions: PermissionResolver,
    forwarding: ForwardResolver,
}

impl ModelService {
    pub(crate) fn new(
        cache: Arc<CacheCoordinator>,
        store: Arc<dyn ModelStore>,
        permissions: PermissionResolver,
        forwarding: ForwardResolver,
    ) -> Self {
        Self {
            cache,
            store,
            permissions,
            forwarding,
        }
    }

    /// The cache coordinator shared by every component of this service.
    pub fn cache(&self) -> &Arc<CacheCoordinator> {
        &self.cache
    }

    /// A subscriber that applies change events to this service's caches.
    pub fn change_feed_subscriber(&self) -> ChangeFeedSubscriber {
        ChangeFeedSubscriber::new(self.cache.clone())
    }

    /// Consume `stream` on a background task, applying each change event.
    pub fn spawn_change_feed<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        self.change_feed_subscriber().spawn(stream)
    }
}

#[async_trait]
impl ModelResolver for ModelService {
    async fn resolve(&self, requested: &str, user_id: i64, app_id: i64, key: &str) -> Result<Model> {
        self.permissions.resolve(requested, user_id, app_id, key).await
    }

    async fn resolve_target(&self, model: Model, prompt: &str) -> Result<Model> {
        self.forwarding.resolve_target(model, prompt).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_model(&self, model: &str) -> Result<Model> {
        let filter = ModelFilter::by_model(model).status(ModelStatus::Active);
        self.store
            .find_one(&filter)
            .await?
            .map(Model::from)
            .ok_or_else(|| HuginnError::ModelNotFound(model.to_string()))
    }

    async fn get_cache_model(&self, id: &str) -> Result<Model> {
        self.cache.get_one(id).await
    }

    async fn save_cache_list(&self, models: &[Model]) -> Result<()> {
        self.cache.save_list(models).await
    }

    async fn remove_cache_model(&self, id: &str) -> Result<()> {
        if let Err(e) = self.cache.remove_one(id).await {
            warn!(model_id = %id, error = %e, "failed to evict model from shared cache");
        }
        Ok(())
    }
}
