//! Service assembly

mod builder;
mod service;

pub use builder::{Huginn, HuginnBuilder};
pub use service::ModelService;
