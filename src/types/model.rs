//! Model configuration types.
//!
//! [`Model`] is the materialized record held in both cache tiers and handed
//! to the dispatch layer. [`ModelRecord`] is the document-store shape that
//! also travels inside change events; it carries bookkeeping fields the
//! cache does not need. Conversion always maps the full record.

use serde::{Deserialize, Serialize};

/// Administrative status of a model.
///
/// Serialized as the integer code used by the store (`1`, `2`, `-1`).
/// Unrecognised codes survive a round trip as [`ModelStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ModelStatus {
    #[default]
    Active,
    Disabled,
    Deleted,
    Unknown(i32),
}

impl ModelStatus {
    pub fn code(self) -> i32 {
        match self {
            ModelStatus::Active => 1,
            ModelStatus::Disabled => 2,
            ModelStatus::Deleted => -1,
            ModelStatus::Unknown(code) => code,
        }
    }

    pub fn is_active(self) -> bool {
        self == ModelStatus::Active
    }

    pub fn is_disabled(self) -> bool {
        self == ModelStatus::Disabled
    }
}

impl From<i32> for ModelStatus {
    fn from(code: i32) -> Self {
        match code {
            1 => ModelStatus::Active,
            2 => ModelStatus::Disabled,
            -1 => ModelStatus::Deleted,
            other => ModelStatus::Unknown(other),
        }
    }
}

impl From<ModelStatus> for i32 {
    fn from(status: ModelStatus) -> Self {
        status.code()
    }
}

/// How a forwarding model picks its substitute.
///
/// Code `1` is a static target; every other code means keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ForwardRule {
    #[default]
    Static,
    Keyword,
}

impl From<i32> for ForwardRule {
    fn from(code: i32) -> Self {
        if code == 1 {
            ForwardRule::Static
        } else {
            ForwardRule::Keyword
        }
    }
}

impl From<ForwardRule> for i32 {
    fn from(rule: ForwardRule) -> Self {
        match rule {
            ForwardRule::Static => 1,
            ForwardRule::Keyword => 2,
        }
    }
}

/// Substitution policy attached to a forwarding model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub forward_rule: ForwardRule,
    /// Target model id for [`ForwardRule::Static`].
    pub target_model: String,
    /// Patterns for [`ForwardRule::Keyword`], evaluated in order.
    pub keywords: Vec<String>,
    /// Target model ids, parallel to `keywords`.
    pub target_models: Vec<String>,
}

impl ForwardConfig {
    /// Unconditionally forward to `target`.
    pub fn fixed(target: impl Into<String>) -> Self {
        Self {
            forward_rule: ForwardRule::Static,
            target_model: target.into(),
            ..Self::default()
        }
    }

    /// Forward by keyword; each `(pattern, target)` pair keeps its position.
    pub fn keywords<K, T>(pairs: impl IntoIterator<Item = (K, T)>) -> Self
    where
        K: Into<String>,
        T: Into<String>,
    {
        let (keywords, target_models) = pairs
            .into_iter()
            .map(|(k, t)| (k.into(), t.into()))
            .unzip();
        Self {
            forward_rule: ForwardRule::Keyword,
            target_model: String::new(),
            keywords,
            target_models,
        }
    }
}

/// A backend-model configuration as served from the caches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: String,
    /// Provider/corp identifier.
    pub corp: String,
    /// Display name.
    pub name: String,
    /// Canonical model identifier that clients pass.
    pub model: String,
    #[serde(rename = "type")]
    pub kind: i32,
    pub base_url: String,
    pub path: String,
    pub prompt: String,
    pub billing_method: i32,
    pub prompt_ratio: f64,
    pub completion_ratio: f64,
    pub fixed_quota: i64,
    pub data_format: i32,
    pub is_public: bool,
    pub is_enable_model_agent: bool,
    pub model_agents: Vec<String>,
    pub is_forward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_config: Option<ForwardConfig>,
    pub remark: String,
    pub status: ModelStatus,
}

impl Model {
    /// Create an active model with the required identity fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ModelStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_corp(mut self, corp: impl Into<String>) -> Self {
        self.corp = corp.into();
        self
    }

    /// Enable forwarding with the given policy.
    pub fn with_forward(mut self, config: ForwardConfig) -> Self {
        self.is_forward = true;
        self.forward_config = Some(config);
        self
    }
}

/// A model as stored in the document store and carried by change events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRecord {
    #[serde(flatten)]
    pub model: Model,
    pub creator: String,
    pub updater: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl ModelRecord {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn updated_at(mut self, millis: i64) -> Self {
        self.updated_at = millis;
        self
    }
}

impl From<ModelRecord> for Model {
    fn from(record: ModelRecord) -> Self {
        record.model
    }
}
