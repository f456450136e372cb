use std::{error::Error, sync::Arc};

use crate::identity::Identity;

/// The error produced by a wrapped fetch.
///
/// This is `Clone` as a single pending fetch may be awaited by both the
/// component that issued it and the completion tracker, and each of them
/// must be able to observe the rejection.
#[derive(Clone, Debug, thiserror::Error)]
pub enum FetchError {
    /// The fetch supplied by the component failed.
    #[error("fetch failed: {0}")]
    Failed(Arc<dyn Error + Send + Sync>),
    /// The task driving the fetch panicked or was cancelled.
    #[error("fetch task aborted: {0}")]
    Aborted(String),
    /// The fetch was issued on the client before the resolution gate was
    /// flipped.
    #[error("premature fetch: {0}")]
    PrematureFetch(Arc<str>),
    /// No prefetched entry was transported for this instance.
    #[error("no prefetched data for instance {0}")]
    NotPrefetched(Identity),
    /// The prefetched entry could not be decoded into the expected type.
    #[error("failed to decode prefetched data: {0}")]
    Decode(Arc<serde_json::Error>),
}

impl FetchError {
    /// Wrap an arbitrary error raised by the underlying fetch.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self::Failed(Arc::from(error.into()))
    }

    /// Whether this is the gate violation raised under the assign policy.
    pub fn is_premature(&self) -> bool {
        matches!(self, Self::PrematureFetch(_))
    }
}

#[cfg(feature = "ssr")]
impl From<tokio::task::JoinError> for FetchError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Aborted(error.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(Arc::new(error))
    }
}

/// Errors from encoding or decoding the self store for transport.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to encode self store: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode self store: {0}")]
    Decode(#[source] serde_json::Error),
}

