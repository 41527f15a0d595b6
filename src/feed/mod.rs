//! Change feed: keeps both cache tiers in step with the model store.
//!
//! The store publishes one JSON envelope per mutation:
//!
//! ```json
//! {"action": "update" | "status" | "delete", "old_data": {...} | null, "new_data": {...} | null}
//! ```
//!
//! [`ChangeFeedSubscriber`] decodes each envelope and applies it through
//! [`CacheCoordinator::apply_change_event`]. Failures are logged and never
//! returned to the transport; redelivery is the transport's business.
//! Events are processed strictly one at a time so two writes for the same
//! id cannot race inside one subscriber.

#[cfg(feature = "redis")]
pub mod redis;

use std::fmt;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::Result;
use crate::cache::CacheCoordinator;
use crate::telemetry;
use crate::types::ModelRecord;

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Record contents changed.
    Update,
    /// Only the status changed.
    Status,
    Delete,
    /// Any action this version does not know; ignored.
    #[serde(other)]
    Unknown,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Update => "update",
            ChangeAction::Status => "status",
            ChangeAction::Delete => "delete",
            ChangeAction::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope published by the store for each mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    #[serde(default)]
    pub old_data: Option<ModelRecord>,
    #[serde(default)]
    pub new_data: Option<ModelRecord>,
}

impl ChangeEvent {
    /// Decode an envelope from its JSON payload.
    pub fn decode(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Id of the model this event concerns, if any snapshot carries one.
    pub fn model_id(&self) -> Option<&str> {
        self.new_data
            .as_ref()
            .or(self.old_data.as_ref())
            .map(|r| r.id())
    }
}

/// Applies change events to the caches.
#[derive(Clone)]
pub struct ChangeFeedSubscriber {
    cache: Arc<CacheCoordinator>,
}

impl ChangeFeedSubscriber {
    pub fn new(cache: Arc<CacheCoordinator>) -> Self {
        Self { cache }
    }

    /// Decode and apply one payload, returning the action applied.
    ///
    /// A decode failure aborts this event only.
    #[instrument(skip(self, payload), level = "debug")]
    pub async fn handle(&self, payload: &str) -> Result<ChangeAction> {
        let event = ChangeEvent::decode(payload)?;
        let action = event.action;
        info!(
            action = %action,
            model_id = event.model_id().unwrap_or_default(),
            "applying model change"
        );
        self.cache.apply_change_event(event).await?;
        Ok(action)
    }

    /// Transport callback: apply one payload, logging any failure.
    pub async fn on_message(&self, payload: &str) {
        match self.handle(payload).await {
            Ok(action) => {
                metrics::counter!(
                    telemetry::CHANGE_EVENTS_TOTAL,
                    "action" => action.as_str(),
                    "status" => "ok"
                )
                .increment(1);
            }
            Err(e) => {
                let action = ChangeEvent::decode(payload)
                    .map(|event| event.action.as_str())
                    .unwrap_or("unknown");
                warn!(action, error = %e, "failed to apply model change");
                metrics::counter!(
                    telemetry::CHANGE_EVENTS_TOTAL,
                    "action" => action,
                    "status" => "error"
                )
                .increment(1);
            }
        }
    }

    /// Consume `stream` sequentially until it ends.
    pub async fn run<S>(self, stream: S)
    where
        S: Stream<Item = String>,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(payload) = stream.next().await {
            self.on_message(&payload).await;
        }
        info!("change feed ended");
    }

    /// Run on a background task.
    pub fn spawn<S>(self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        tokio::spawn(self.run(stream))
    }
}
