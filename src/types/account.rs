//! Account types that carry model permissions.
//!
//! Each account scope grants a set of model ids. An empty set on an
//! [`App`] or [`Key`] means the scope does not restrict and defers to the
//! next broader scope; an empty set on a [`User`] grants nothing.

use serde::{Deserialize, Serialize};

use super::ModelStatus;

/// End-user account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub user_id: i64,
    pub name: String,
    pub quota: i64,
    /// Permitted model ids.
    pub models: Vec<String>,
    pub status: ModelStatus,
}

impl User {
    pub fn new(user_id: i64, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            user_id,
            models: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Tenant/application account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub id: String,
    pub app_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i32,
    /// Permitted model ids; empty defers to the user scope.
    pub models: Vec<String>,
    pub quota: i64,
    pub ip_whitelist: Vec<String>,
    pub ip_blacklist: Vec<String>,
    pub remark: String,
    pub status: ModelStatus,
}

impl App {
    pub fn new(app_id: i64, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            app_id,
            models: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// API credential.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Key {
    pub id: String,
    /// The secret presented by the caller.
    pub key: String,
    pub user_id: i64,
    pub app_id: i64,
    /// Permitted model ids; empty defers to the application scope.
    pub models: Vec<String>,
    pub status: ModelStatus,
}

impl Key {
    pub fn new(
        key: impl Into<String>,
        app_id: i64,
        models: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            app_id,
            models: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
