//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `tier` — cache tier: "local" or "shared"
//! - `scope` — permission scope: "user", "app" or "key"
//! - `outcome` — resolution result: "ok", "not_found", "disabled" or "error"
//! - `action` — change event action: "update", "status", "delete" or "unknown"
//! - `status` — outcome: "ok" or "error"

/// Cache hits, per record.
///
/// Labels: `tier`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Cache misses, per record.
///
/// Labels: `tier`.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Times a scope's model set had to be reloaded from the model store.
///
/// Labels: `scope`.
pub const STORE_FALLBACKS_TOTAL: &str = "huginn_store_fallbacks_total";

/// Total permission resolutions.
///
/// Labels: `outcome`.
pub const RESOLUTIONS_TOTAL: &str = "huginn_resolutions_total";

/// Permission resolution duration in seconds.
pub const RESOLUTION_DURATION_SECONDS: &str = "huginn_resolution_duration_seconds";

/// Forwarding substitutions taken.
pub const FORWARD_HOPS_TOTAL: &str = "huginn_forward_hops_total";

/// Change events processed.
///
/// Labels: `action`, `status` ("ok" | "error").
pub const CHANGE_EVENTS_TOTAL: &str = "huginn_change_events_total";
