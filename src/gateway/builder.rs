//! Builder for wiring a model service from its collaborators

use std::sync::Arc;

use super::ModelService;
use crate::cache::{CacheCoordinator, DEFAULT_NAMESPACE, LocalCache, LocalCacheConfig, SharedCache};
use crate::resolver::{DEFAULT_MAX_HOPS, ForwardResolver, PermissionResolver};
use crate::store::{AccountSource, ModelStore};
use crate::{HuginnError, Result};

/// Main entry point for creating model services.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the service.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring a [`ModelService`].
///
/// The model store, account source and shared cache have no defaults;
/// leaving any of them out makes [`build`](Self::build) fail with
/// [`HuginnError::Configuration`].
pub struct HuginnBuilder {
    model_store: Option<Arc<dyn ModelStore>>,
    accounts: Option<Arc<dyn AccountSource>>,
    shared_cache: Option<Arc<dyn SharedCache>>,
    namespace: String,
    local_cache: LocalCacheConfig,
    max_forward_hops: usize,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            model_store: None,
            accounts: None,
            shared_cache: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            local_cache: LocalCacheConfig::default(),
            max_forward_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Authoritative model store, queried on cache shortfall.
    pub fn model_store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.model_store = Some(store);
        self
    }

    /// Source of user, application and key records.
    pub fn accounts(mut self, accounts: Arc<dyn AccountSource>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Fleet-wide cache tier.
    pub fn shared_cache(mut self, cache: Arc<dyn SharedCache>) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    /// Shared-cache namespace holding model records (default: `api:models`).
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn local_cache(mut self, config: LocalCacheConfig) -> Self {
        self.local_cache = config;
        self
    }

    /// Maximum forwarding hops before a chain is treated as a cycle.
    pub fn max_forward_hops(mut self, hops: usize) -> Self {
        self.max_forward_hops = hops;
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<ModelService> {
        let store = self
            .model_store
            .ok_or_else(|| HuginnError::Configuration("no model store configured".into()))?;
        let accounts = self
            .accounts
            .ok_or_else(|| HuginnError::Configuration("no account source configured".into()))?;
        let shared = self
            .shared_cache
            .ok_or_else(|| HuginnError::Configuration("no shared cache configured".into()))?;
        if self.namespace.is_empty() {
            return Err(HuginnError::Configuration(
                "shared cache namespace must not be empty".into(),
            ));
        }

        tracing::debug!(
            store = store.name(),
            shared_cache = shared.name(),
            namespace = %self.namespace,
            max_entries = self.local_cache.max_entries,
            max_forward_hops = self.max_forward_hops,
            "building model service"
        );

        let cache = Arc::new(CacheCoordinator::new(
            LocalCache::with_config(&self.local_cache),
            shared,
            self.namespace,
        ));
        let permissions = PermissionResolver::new(cache.clone(), store.clone(), accounts);
        let forwarding = ForwardResolver::new(cache.clone()).max_hops(self.max_forward_hops);

        Ok(ModelService::new(cache, store, permissions, forwarding))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
