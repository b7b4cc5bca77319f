//! # Configuration Store
//!
//! The internal configuration lookup consumed by the fetch handler. The
//! production store lives outside this crate; [`InMemoryConfigStore`] backs the
//! replay tool and tests.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::fetch::keys::ConfigKey;

pub use memory::InMemoryConfigStore;

/// Source of configuration values keyed by internal configuration name
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the current value for `key`
    async fn query(&self, key: ConfigKey) -> Result<Value, StoreError>;

    /// Store name for debugging
    fn store_name(&self) -> &str;
}
