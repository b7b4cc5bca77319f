//! # Document Rendering
//!
//! Maps each internal [`ConfigKey`] to the renderer that turns the store's value
//! into a reply document. A key without a renderer is a typed
//! [`FetchError::NoRenderer`], never a panic.

pub mod acl;
pub mod xml;

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::fetch::keys::ConfigKey;

pub use acl::{AclDocument, AclPolicy, AclRenderer};
pub use xml::XmlWriter;

/// Renderer rejected a store value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct RenderError {
    reason: String,
}

impl RenderError {
    pub fn new<R: Into<String>>(reason: R) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Turns a configuration value into a reply document
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, value: &Value) -> std::result::Result<String, RenderError>;

    /// Get renderer name for debugging
    fn renderer_name(&self) -> &str;
}

/// Explicit internal key → renderer table
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<ConfigKey, Arc<dyn DocumentRenderer>>,
}

impl RendererRegistry {
    /// Registry with no renderers
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Standard registry built from loaded configuration
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::empty().with_renderer(ConfigKey::Acls, Arc::new(AclRenderer::new(config.acl.clone())))
    }

    /// Register a renderer, replacing any existing one for `key`
    pub fn with_renderer(mut self, key: ConfigKey, renderer: Arc<dyn DocumentRenderer>) -> Self {
        if self.renderers.contains_key(&key) {
            warn!(key = %key, "Replacing existing renderer");
        }
        info!(key = %key, renderer = renderer.renderer_name(), "Registered document renderer");
        self.renderers.insert(key, renderer);
        self
    }

    pub fn renderer_for(&self, key: ConfigKey) -> Result<Arc<dyn DocumentRenderer>> {
        self.renderers
            .get(&key)
            .cloned()
            .ok_or(FetchError::NoRenderer { key })
    }

    /// Look up the renderer for `key` and render `value` with it
    pub fn render(&self, key: ConfigKey, value: &Value) -> Result<String> {
        self.renderer_for(key)?
            .render(value)
            .map_err(|e| FetchError::render_failure(key, e.reason()))
    }

    pub fn has_renderer(&self, key: ConfigKey) -> bool {
        self.renderers.contains_key(&key)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<ConfigKey> = self.renderers.keys().copied().collect();
        keys.sort();
        f.debug_struct("RendererRegistry").field("keys", &keys).finish()
    }
}
