//! # Fetch Error Types
//!
//! Typed failures for the fetch pipeline. Every [`FetchError`] is terminal to the
//! dispatched task that produced it: the handler converts it into the empty
//! response and the listener never sees it.

use crate::fetch::keys::ConfigKey;
use thiserror::Error;

/// Failures that can occur while resolving a fetch request into a document
#[derive(Debug, Error)]
pub enum FetchError {
    /// The external configuration name has no internal translation
    #[error("No internal configuration key for '{conf_name}'")]
    UnmappedKey { conf_name: String },

    /// The configuration store failed while being queried
    #[error("Configuration lookup failed for '{key}': {source}")]
    LookupFailure {
        key: ConfigKey,
        #[source]
        source: StoreError,
    },

    /// No renderer is registered for the internal key
    #[error("No renderer registered for '{key}'")]
    NoRenderer { key: ConfigKey },

    /// The renderer rejected the store's response
    #[error("Rendering failed for '{key}': {reason}")]
    RenderFailure { key: ConfigKey, reason: String },

    /// A store or renderer panicked while the fetch was being resolved
    #[error("Resolution of '{conf_name}' panicked: {reason}")]
    ResolverPanic { conf_name: String, reason: String },
}

impl FetchError {
    /// Create an unmapped key error
    pub fn unmapped_key<S: Into<String>>(conf_name: S) -> Self {
        Self::UnmappedKey {
            conf_name: conf_name.into(),
        }
    }

    /// Create a render failure error
    pub fn render_failure<R: Into<String>>(key: ConfigKey, reason: R) -> Self {
        Self::RenderFailure {
            key,
            reason: reason.into(),
        }
    }

    pub fn resolver_panic<S: Into<String>, R: Into<String>>(conf_name: S, reason: R) -> Self {
        Self::ResolverPanic {
            conf_name: conf_name.into(),
            reason: reason.into(),
        }
    }

    /// Stable short label used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::UnmappedKey { .. } => "unmapped_key",
            FetchError::LookupFailure { .. } => "lookup_failure",
            FetchError::NoRenderer { .. } => "no_renderer",
            FetchError::RenderFailure { .. } => "render_failure",
            FetchError::ResolverPanic { .. } => "resolver_panic",
        }
    }
}

/// Errors raised by a [`ConfigStore`](crate::store::ConfigStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("No configuration stored for '{key}'")]
    NotFound { key: ConfigKey },

    #[error("Configuration store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors raised when sending a reply back over the fetch channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Reply channel is closed")]
    Closed,

    #[error("Reply rejected by channel: {reason}")]
    Rejected { reason: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
