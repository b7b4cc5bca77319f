#![allow(dead_code)]

use async_trait::async_trait;
use config_fetch::{
    ChannelError, ConfigFetchHandler, ConfigKey, ConfigStore, FetchChannel, FetchReply,
    InMemoryConfigStore, RequestId, StoreError,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Channel that keeps every reply it is given
#[derive(Default)]
pub struct RecordingChannel {
    replies: Mutex<Vec<FetchReply>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replies(&self) -> Vec<FetchReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn reply_for(&self, request_id: &str) -> Option<FetchReply> {
        self.replies()
            .into_iter()
            .find(|reply| reply.request_id.as_str() == request_id)
    }
}

#[async_trait]
impl FetchChannel for RecordingChannel {
    async fn send_reply(
        &self,
        request_id: &RequestId,
        document: String,
    ) -> Result<(), ChannelError> {
        self.replies
            .lock()
            .unwrap()
            .push(FetchReply::new(request_id.clone(), document));
        Ok(())
    }
}

/// Channel whose peer has gone away
pub struct ClosedChannel;

#[async_trait]
impl FetchChannel for ClosedChannel {
    async fn send_reply(&self, _: &RequestId, _: String) -> Result<(), ChannelError> {
        Err(ChannelError::Closed)
    }
}

/// Store that fails every query
pub struct FailingStore;

#[async_trait]
impl ConfigStore for FailingStore {
    async fn query(&self, _key: ConfigKey) -> Result<Value, StoreError> {
        Err(StoreError::Unavailable {
            reason: "store offline".to_string(),
        })
    }

    fn store_name(&self) -> &str {
        "failing"
    }
}

/// Store whose lookups panic
pub struct PanickingStore;

#[async_trait]
impl ConfigStore for PanickingStore {
    async fn query(&self, _key: ConfigKey) -> Result<Value, StoreError> {
        panic!("store backend poisoned");
    }

    fn store_name(&self) -> &str {
        "panicking"
    }
}

/// Store that returns whatever value it was built with, after a short pause
pub struct SlowStore {
    pub value: Value,
    pub delay: std::time::Duration,
}

#[async_trait]
impl ConfigStore for SlowStore {
    async fn query(&self, _key: ConfigKey) -> Result<Value, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.value.clone())
    }

    fn store_name(&self) -> &str {
        "slow"
    }
}

pub fn sample_acls() -> Value {
    json!({"acl_list": ["192.168.0.0/16 allow"]})
}

pub fn seeded_store() -> Arc<InMemoryConfigStore> {
    let store = InMemoryConfigStore::new();
    store.set(ConfigKey::Acls, sample_acls());
    Arc::new(store)
}

pub fn handler_with(
    store: Arc<dyn ConfigStore>,
    channel: Arc<RecordingChannel>,
) -> ConfigFetchHandler {
    ConfigFetchHandler::new(store, channel)
}
