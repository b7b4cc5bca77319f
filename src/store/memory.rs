//! In-memory configuration store

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::ConfigStore;
use crate::error::StoreError;
use crate::fetch::keys::ConfigKey;

/// Concurrent map of configuration values, safe to share across dispatched tasks
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    values: DashMap<ConfigKey, Value>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated seed values
    pub fn from_seed(seed: HashMap<ConfigKey, Value>) -> Self {
        let store = Self::new();
        for (key, value) in seed {
            store.set(key, value);
        }
        store
    }

    /// Replace the value stored for `key`, returning the previous one
    pub fn set(&self, key: ConfigKey, value: Value) -> Option<Value> {
        debug!(key = %key, "Storing configuration value");
        self.values.insert(key, value)
    }

    pub fn remove(&self, key: ConfigKey) -> Option<Value> {
        self.values.remove(&key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn query(&self, key: ConfigKey) -> Result<Value, StoreError> {
        self.values
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound { key })
    }

    fn store_name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_returns_stored_value() {
        let store = InMemoryConfigStore::new();
        store.set(ConfigKey::Acls, json!({"acl_list": ["10.0.0.0/8 allow"]}));

        let value = store.query(ConfigKey::Acls).await.unwrap();
        assert_eq!(value["acl_list"][0], "10.0.0.0/8 allow");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert_eq!(
            store.query(ConfigKey::Acls).await.unwrap_err(),
            StoreError::NotFound {
                key: ConfigKey::Acls
            }
        );
    }

    #[tokio::test]
    async fn test_remove_and_seed() {
        let mut seed = HashMap::new();
        seed.insert(ConfigKey::Acls, json!({}));
        let store = InMemoryConfigStore::from_seed(seed);
        assert_eq!(store.len(), 1);

        assert!(store.remove(ConfigKey::Acls).is_some());
        assert!(store.is_empty());
        assert!(store.query(ConfigKey::Acls).await.is_err());
    }
}
