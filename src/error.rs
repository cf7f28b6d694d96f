//! Caller-facing error taxonomy
//!
//! A resolution either yields data (fresh or explicitly stale) or one of these
//! typed errors. Single-flight waiters share one outcome, so the error is
//! `Clone` and wraps non-cloneable causes in `Arc`.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::StoreError;
use crate::key::KeyError;
use crate::normalize::NormalizationError;
use crate::upstream::UpstreamError;

/// Why a resolution could not produce fresh data
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Malformed entity key; a caller bug, never retried
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Transport or HTTP failure talking to the provider
    #[error("Upstream error: {0}")]
    Upstream(Arc<UpstreamError>),

    /// The provider's payload did not have a recognizable shape
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// The durable store is unavailable
    #[error("Store error: {0}")]
    Store(Arc<StoreError>),
}

impl From<UpstreamError> for ResolveError {
    fn from(e: UpstreamError) -> Self {
        ResolveError::Upstream(Arc::new(e))
    }
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        ResolveError::Store(Arc::new(e))
    }
}

impl ResolveError {
    /// Short machine-readable kind, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::InvalidKey(_) => "invalid_key",
            ResolveError::Upstream(_) => "upstream_error",
            ResolveError::Normalization(_) => "normalization_error",
            ResolveError::Store(_) => "store_error",
        }
    }

    /// Whether a stale cached value may stand in for this failure
    pub fn allows_stale_fallback(&self) -> bool {
        matches!(
            self,
            ResolveError::Upstream(_) | ResolveError::Normalization(_)
        )
    }
}
