//! Huginn error types

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Authorization outcomes (terminal for the request, never retried)
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model disabled: {0}")]
    ModelDisabled(String),

    /// A forwarding chain revisited a model or ran past the hop limit.
    #[error("forwarding cycle at model {model} after {hops} hops")]
    ForwardingCycle { model: String, hops: usize },

    #[error("{kind} not found: {id}")]
    AccountNotFound { kind: &'static str, id: String },

    // Tier errors (recovered by falling back one tier outward)
    /// Neither cache tier produced a usable record.
    #[error("not found in cache: {0}")]
    NotFound(String),

    #[error("shared cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("model store unavailable: {0}")]
    StoreUnavailable(String),

    // Data errors
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid change event: {0}")]
    InvalidEvent(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Whether this error is a definitive authorization outcome for the request.
    ///
    /// These are surfaced to the caller as a request rejection and must not
    /// be retried.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            HuginnError::ModelNotFound(_)
                | HuginnError::ModelDisabled(_)
                | HuginnError::ForwardingCycle { .. }
        )
    }

    /// Whether this error comes from a cache tier or the store.
    ///
    /// Callers fall through to the next tier outward on these.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            HuginnError::NotFound(_)
                | HuginnError::CacheUnavailable(_)
                | HuginnError::StoreUnavailable(_)
                | HuginnError::Decode(_)
        )
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for HuginnError {
    fn from(err: redis::RedisError) -> Self {
        HuginnError::CacheUnavailable(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
