//! Request-path resolution: permissions first, then forwarding.

mod forward;
mod permission;

pub use forward::{DEFAULT_MAX_HOPS, ForwardResolver, KeywordMatcher};
pub use permission::{PermissionResolver, candidates, cascade};
