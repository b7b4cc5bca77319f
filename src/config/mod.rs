//! # Fetch Adapter Configuration
//!
//! YAML-based configuration with environment-specific overrides, loaded through
//! [`ConfigManager`]. Every section has defaults, so an empty file is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config_fetch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let buffer = manager.config().handler.event_buffer_size;
//! let list = &manager.config().acl.default_list_name;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::constants;
use crate::fetch::keys::ConfigKey;
use crate::render::acl::AclPolicy;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring fetch-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Fetch handler and listener settings
    pub handler: HandlerConfig,

    /// ACL document rendering settings
    pub acl: AclConfig,

    /// Values preloaded into the in-memory configuration store
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Bounded buffer between the fetch channel and the listener loop
    pub event_buffer_size: usize,

    /// Diagnostic tag attached to every dispatched task's span
    pub call_id: String,

    /// Log fetches answered with the empty response without dispatch
    pub log_ignored_events: bool,

    /// How long the listener waits for reply capacity before dropping an
    /// inline empty response
    pub inline_reply_timeout_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            call_id: "config_fetch".to_string(),
            log_ignored_events: true,
            inline_reply_timeout_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AclConfig {
    /// Network list receiving `acl_list` entries and entries without a list name
    pub default_list_name: String,

    /// `default` attribute for lists without an explicit entry in `list_defaults`
    pub default_policy: AclPolicy,

    /// Per-list `default` attribute
    pub list_defaults: HashMap<String, AclPolicy>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            default_list_name: constants::acl::DEFAULT_LIST_NAME.to_string(),
            default_policy: AclPolicy::Deny,
            list_defaults: HashMap::new(),
        }
    }
}

impl AclConfig {
    /// Resolve the `default` attribute for a network list
    pub fn policy_for(&self, list_name: &str) -> AclPolicy {
        self.list_defaults
            .get(list_name)
            .copied()
            .unwrap_or(self.default_policy)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Internal key name (e.g. `acls`) to stored value
    pub seed: HashMap<String, Value>,
}

impl StoreConfig {
    /// Seed values keyed by [`ConfigKey`], rejecting unknown names
    pub fn seed_values(&self) -> ConfigResult<HashMap<ConfigKey, Value>> {
        self.seed
            .iter()
            .map(|(name, value)| {
                name.parse::<ConfigKey>()
                    .map(|key| (key, value.clone()))
                    .map_err(|reason| ConfigurationError::invalid_value("store.seed", name, reason))
            })
            .collect()
    }
}

impl FetchConfig {
    /// Check invariants the handler relies on
    pub fn validate(&self) -> ConfigResult<()> {
        if self.handler.event_buffer_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "handler.event_buffer_size",
                "0",
                "event buffer must hold at least one event",
            ));
        }

        if self.handler.inline_reply_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "handler.inline_reply_timeout_ms",
                "0",
                "inline replies need a non-zero wait",
            ));
        }

        if self.handler.call_id.trim().is_empty() {
            return Err(ConfigurationError::validation_error(
                "handler.call_id cannot be empty",
            ));
        }

        if self.acl.default_list_name.trim().is_empty() {
            return Err(ConfigurationError::validation_error(
                "acl.default_list_name cannot be empty",
            ));
        }

        if let Some(name) = self.acl.list_defaults.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "acl.list_defaults",
                name.clone(),
                "network list names cannot be empty",
            ));
        }

        self.store.seed_values()?;

        Ok(())
    }
}
