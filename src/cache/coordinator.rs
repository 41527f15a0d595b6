//! Read-through/write-through coordination across both cache tiers.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::{LocalCache, SharedCache};
use crate::feed::{ChangeAction, ChangeEvent};
use crate::telemetry;
use crate::types::Model;
use crate::{HuginnError, Result};

/// Owns both cache tiers and keeps them in step.
///
/// This type never escalates to the model store: callers compare the number
/// of records returned by [`get_list`](Self::get_list) with the number of
/// ids they asked for and refill from the store themselves on a shortfall.
pub struct CacheCoordinator {
    local: LocalCache,
    shared: Arc<dyn SharedCache>,
    namespace: String,
}

impl CacheCoordinator {
    pub fn new(local: LocalCache, shared: Arc<dyn SharedCache>, namespace: impl Into<String>) -> Self {
        Self {
            local,
            shared,
            namespace: namespace.into(),
        }
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Look up models by id, local tier first.
    ///
    /// Ids missing locally are fetched from the shared tier in one batch and
    /// backfilled into the local tier. Records that fail to decode are
    /// skipped. The result may be shorter than `ids`.
    ///
    /// Fails with [`HuginnError::NotFound`] only when nothing was found
    /// locally and the shared tier was unreachable or had nothing usable.
    #[instrument(skip(self, ids), fields(count = ids.len()), level = "debug")]
    pub async fn get_list(&self, ids: &[String]) -> Result<Vec<Model>> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            match self.local.get(id) {
                Some(model) => found.push(model),
                None => missing.push(id.clone()),
            }
        }
        record_lookup("local", found.len(), missing.len());

        if missing.is_empty() {
            return Ok(found);
        }

        let local_hits = found.len();
        let payloads = match self.shared.hmget(&self.namespace, &missing).await {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!(
                    backend = self.shared.name(),
                    error = %e,
                    "shared cache read failed"
                );
                return if local_hits > 0 {
                    Ok(found)
                } else {
                    Err(HuginnError::NotFound(missing.join(",")))
                };
            }
        };

        for (id, payload) in missing.iter().zip(payloads) {
            let Some(payload) = payload.filter(|p| !p.is_empty()) else {
                continue;
            };
            match serde_json::from_str::<Model>(&payload) {
                Ok(model) => {
                    self.local.insert(model.clone());
                    found.push(model);
                }
                Err(e) => {
                    warn!(model_id = %id, error = %e, "skipping undecodable cached model");
                }
            }
        }
        let shared_hits = found.len() - local_hits;
        record_lookup("shared", shared_hits, missing.len() - shared_hits);

        if found.is_empty() {
            return Err(HuginnError::NotFound(missing.join(",")));
        }
        Ok(found)
    }

    /// Look up a single model.
    pub async fn get_one(&self, id: &str) -> Result<Model> {
        self.get_list(&[id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HuginnError::NotFound(id.to_string()))
    }

    /// Write models to the local tier, then to the shared tier in one batch.
    ///
    /// If the shared write fails the error is returned but the local tier
    /// keeps the new records.
    #[instrument(skip(self, models), fields(count = models.len()), level = "debug")]
    pub async fn save_list(&self, models: &[Model]) -> Result<()> {
        let mut fields = Vec::with_capacity(models.len());
        for model in models {
            fields.push((model.id.clone(), serde_json::to_string(model)?));
            self.local.insert(model.clone());
        }

        if fields.is_empty() {
            return Ok(());
        }
        self.shared.hset(&self.namespace, &fields).await
    }

    /// Remove a model from both tiers.
    ///
    /// The local tier is always cleared; a shared-tier failure is returned
    /// for the caller to log. Removing an absent id succeeds.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove_one(&self, id: &str) -> Result<()> {
        self.local.remove(id);
        self.shared.hdel(&self.namespace, id).await
    }

    /// Apply one change event to both tiers. Idempotent.
    ///
    /// `update` and `status` write the full new record; `delete` removes by
    /// the id of the old record (or the new one if no old record was sent).
    pub async fn apply_change_event(&self, event: ChangeEvent) -> Result<()> {
        match event.action {
            ChangeAction::Update | ChangeAction::Status => {
                let record = event.new_data.ok_or_else(|| {
                    HuginnError::InvalidEvent(format!("{} event without new_data", event.action))
                })?;
                self.save_list(&[Model::from(record)]).await
            }
            ChangeAction::Delete => {
                let id = event
                    .old_data
                    .or(event.new_data)
                    .map(|r| r.model.id)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        HuginnError::InvalidEvent("delete event without a model id".to_string())
                    })?;
                self.remove_one(&id).await
            }
            ChangeAction::Unknown => {
                debug!("ignoring change event with unknown action");
                Ok(())
            }
        }
    }
}

fn record_lookup(tier: &'static str, hits: usize, misses: usize) {
    if hits > 0 {
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => tier).increment(hits as u64);
    }
    if misses > 0 {
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "tier" => tier).increment(misses as u64);
    }
}
