//! Public types for the Huginn API.

mod account;
mod model;

pub use account::{App, Key, User};
pub use model::{ForwardConfig, ForwardRule, Model, ModelRecord, ModelStatus};
