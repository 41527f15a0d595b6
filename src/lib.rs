//! Huginn - model resolution and permission cascade for LLM API gateways
//!
//! Given a requested model name and the caller's user, application and API
//! key, Huginn decides which backend model configuration the caller may use
//! and whether it is transparently forwarded to another model. Lookups are
//! served from a two-tier cache (process-local plus a shared hash cache)
//! that an asynchronous change feed keeps in step with the model store.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use huginn::cache::MemorySharedCache;
//! use huginn::store::{MemoryAccounts, MemoryModelStore};
//! use huginn::types::{App, Key, Model, ModelRecord, User};
//! use huginn::{Huginn, ModelResolver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> huginn::Result<()> {
//! let store = MemoryModelStore::new()
//!     .with_records([ModelRecord::new(Model::new("m1", "GPT-4o", "gpt-4o"))]);
//! let accounts = MemoryAccounts::new()
//!     .with_user(User::new(1, ["m1"]))
//!     .with_app(App::new(7, Vec::<String>::new()))
//!     .with_key(Key::new("sk-test", 7, Vec::<String>::new()));
//!
//! let service = Huginn::builder()
//!     .model_store(Arc::new(store))
//!     .accounts(Arc::new(accounts))
//!     .shared_cache(Arc::new(MemorySharedCache::new()))
//!     .build()?;
//!
//! let model = service.resolve("gpt-4o", 1, 7, "sk-test").await?;
//! let model = service.resolve_target(model, "hello").await?;
//! assert_eq!(model.id, "m1");
//! # Ok(())
//! # }
//! ```

pub mod cache;
#[cfg(feature = "cli")]
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod resolver;
pub mod store;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheCoordinator, LocalCacheConfig, SharedCache};
pub use error::{HuginnError, Result};
pub use feed::{ChangeAction, ChangeEvent, ChangeFeedSubscriber};
pub use gateway::{Huginn, HuginnBuilder, ModelService};
pub use store::{AccountSource, ModelStore};
pub use traits::ModelResolver;
pub use types::{ForwardConfig, ForwardRule, Model, ModelRecord, ModelStatus};
pub use version::{PKG_VERSION, version_string};
