//! Three-scope permission cascade.
//!
//! A request names a model and arrives with a user, an application and a
//! key. Each scope grants a set of model ids; the narrowest scope that
//! declares a set decides which record is used, and every broader scope
//! must independently grant the same id:
//!
//! ```text
//! key candidates  ──▶ same id in app candidates? ──▶ same id in user candidates? ──▶ ✓
//!   (if empty)          (skipped if app is empty)
//! app candidates  ──▶ same id in user candidates? ──▶ ✓
//!   (if empty)
//! user candidates ──▶ ✓
//! ```
//!
//! Disabled candidates are skipped but remembered, so an otherwise-matching
//! disabled model yields [`HuginnError::ModelDisabled`] rather than
//! [`HuginnError::ModelNotFound`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::cache::CacheCoordinator;
use crate::store::{AccountSource, ModelFilter, ModelSort, ModelStore};
use crate::telemetry;
use crate::types::{Model, ModelStatus};
use crate::{HuginnError, Result};

/// Build a scope's candidate list for `requested`.
///
/// The first model whose display name equals `requested` (at most one)
/// comes first, followed by every model whose canonical identifier equals
/// `requested`, in their original order. A model matching both ways
/// appears in both positions.
pub fn candidates(models: &[Model], requested: &str) -> Vec<Model> {
    let by_name = models.iter().find(|m| m.name == requested);
    let by_model = models.iter().filter(|m| m.model == requested);
    by_name.into_iter().chain(by_model).cloned().collect()
}

/// Pick the authorized model from per-scope candidate lists.
///
/// `key` and `app` are `None` when that scope declares no models and so
/// does not restrict.
pub fn cascade(
    requested: &str,
    key: Option<&[Model]>,
    app: Option<&[Model]>,
    user: &[Model],
) -> Result<Model> {
    let granted_by = |list: &[Model], id: &str| list.iter().any(|m| m.id == id);
    let mut saw_disabled = false;

    let decided = match (key, app) {
        (Some(key), app) => key.iter().find(|m| {
            if m.status.is_disabled() {
                saw_disabled = true;
                return false;
            }
            app.is_none_or(|app| granted_by(app, &m.id)) && granted_by(user, &m.id)
        }),
        (None, Some(app)) => app.iter().find(|m| {
            if m.status.is_disabled() {
                saw_disabled = true;
                return false;
            }
            granted_by(user, &m.id)
        }),
        (None, None) => user.iter().find(|m| {
            if m.status.is_disabled() {
                saw_disabled = true;
                return false;
            }
            true
        }),
    };

    match decided {
        Some(model) => Ok(model.clone()),
        None if saw_disabled => Err(HuginnError::ModelDisabled(requested.to_string())),
        None => Err(HuginnError::ModelNotFound(requested.to_string())),
    }
}

/// Resolves a requested model name to the record the caller may use.
pub struct PermissionResolver {
    cache: Arc<CacheCoordinator>,
    store: Arc<dyn ModelStore>,
    accounts: Arc<dyn AccountSource>,
}

impl PermissionResolver {
    pub fn new(
        cache: Arc<CacheCoordinator>,
        store: Arc<dyn ModelStore>,
        accounts: Arc<dyn AccountSource>,
    ) -> Self {
        Self {
            cache,
            store,
            accounts,
        }
    }

    /// Resolve `requested` for the given user, application and key secret.
    ///
    /// Always fails with [`HuginnError::ModelNotFound`] or
    /// [`HuginnError::ModelDisabled`]. Account, cache and store failures are
    /// logged and reported as not found.
    #[instrument(skip(self, key), level = "debug")]
    pub async fn resolve(
        &self,
        requested: &str,
        user_id: i64,
        app_id: i64,
        key: &str,
    ) -> Result<Model> {
        let start = Instant::now();
        let result = self.resolve_inner(requested, user_id, app_id, key).await;

        metrics::histogram!(telemetry::RESOLUTION_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "ok",
            Err(HuginnError::ModelNotFound(_)) => "not_found",
            Err(HuginnError::ModelDisabled(_)) => "disabled",
            Err(_) => "error",
        };
        metrics::counter!(telemetry::RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);

        match result {
            Err(e) if e.is_authorization() => {
                debug!(requested, user_id, app_id, error = %e, "model resolution rejected");
                Err(e)
            }
            // Callers only ever see an authorization outcome.
            Err(e) => {
                warn!(requested, user_id, app_id, error = %e, "model resolution failed");
                Err(HuginnError::ModelNotFound(requested.to_string()))
            }
            ok => ok,
        }
    }

    async fn resolve_inner(
        &self,
        requested: &str,
        user_id: i64,
        app_id: i64,
        key: &str,
    ) -> Result<Model> {
        let user = self.accounts.user(user_id).await?;
        if user.models.is_empty() {
            return Err(HuginnError::ModelNotFound(requested.to_string()));
        }
        let user_models = self.load_models("user", &user.models).await?;
        if user_models.is_empty() {
            return Err(HuginnError::ModelNotFound(requested.to_string()));
        }
        let user_candidates = self.scope_candidates(&user_models, requested)?;

        let app = self.accounts.app(app_id).await?;
        let key = self.accounts.key(key).await?;

        let key_candidates = match key.models.is_empty() {
            true => None,
            false => {
                let models = self.load_models("key", &key.models).await?;
                Some(self.scope_candidates(&models, requested)?)
            }
        };
        let app_candidates = match app.models.is_empty() {
            true => None,
            false => {
                let models = self.load_models("app", &app.models).await?;
                Some(self.scope_candidates(&models, requested)?)
            }
        };

        cascade(
            requested,
            key_candidates.as_deref(),
            app_candidates.as_deref(),
            &user_candidates,
        )
    }

    /// Candidates for one scope; a scope that grants nothing named
    /// `requested` rejects the request outright.
    fn scope_candidates(&self, models: &[Model], requested: &str) -> Result<Vec<Model>> {
        let found = candidates(models, requested);
        if found.is_empty() {
            return Err(HuginnError::ModelNotFound(requested.to_string()));
        }
        Ok(found)
    }

    /// Materialize a scope's model ids, refilling from the store when the
    /// caches come up short.
    async fn load_models(&self, scope: &'static str, ids: &[String]) -> Result<Vec<Model>> {
        match self.cache.get_list(ids).await {
            Ok(models) if models.len() == ids.len() => return Ok(models),
            Ok(models) => debug!(scope, cached = models.len(), wanted = ids.len(), "partial cache hit"),
            Err(e) => debug!(scope, error = %e, "cache miss"),
        }

        metrics::counter!(telemetry::STORE_FALLBACKS_TOTAL, "scope" => scope).increment(1);
        let filter = ModelFilter::by_ids(ids).status(ModelStatus::Active);
        let records = self
            .store
            .find_many(&filter, ModelSort::UpdatedAtDesc)
            .await?;
        let models: Vec<Model> = records.into_iter().map(Model::from).collect();

        if let Err(e) = self.cache.save_list(&models).await {
            warn!(scope, store = self.store.name(), error = %e, "failed to refill model cache");
        }
        Ok(models)
    }
}
