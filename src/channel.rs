//! # Reply Channel
//!
//! Outbound half of the media server's fetch channel. The handler only needs
//! `send_reply`; binding and registration of the channel belong to the
//! integration layer that owns it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::constants::EMPTY_RESPONSE;
use crate::error::ChannelError;
use crate::fetch::request::RequestId;

/// Answer to one fetch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReply {
    pub request_id: RequestId,
    pub document: String,
}

impl FetchReply {
    pub fn new(request_id: RequestId, document: String) -> Self {
        Self {
            request_id,
            document,
        }
    }

    pub fn empty(request_id: RequestId) -> Self {
        Self::new(request_id, EMPTY_RESPONSE.to_string())
    }

    pub fn is_empty_response(&self) -> bool {
        self.document == EMPTY_RESPONSE
    }
}

/// Channel the media server is waiting on for fetch replies
#[async_trait]
pub trait FetchChannel: Send + Sync {
    async fn send_reply(&self, request_id: &RequestId, document: String)
        -> Result<(), ChannelError>;
}

/// [`FetchChannel`] that forwards replies into a tokio mpsc queue
#[derive(Debug, Clone)]
pub struct MpscFetchChannel {
    sender: mpsc::Sender<FetchReply>,
}

impl MpscFetchChannel {
    /// Create a channel and the receiver its replies arrive on
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<FetchReply>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl FetchChannel for MpscFetchChannel {
    async fn send_reply(
        &self,
        request_id: &RequestId,
        document: String,
    ) -> Result<(), ChannelError> {
        debug!(request_id = %request_id, bytes = document.len(), "Sending fetch reply");
        self.sender
            .send(FetchReply::new(request_id.clone(), document))
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_arrive_in_order() {
        let (channel, mut replies) = MpscFetchChannel::new(4);

        channel
            .send_reply(&RequestId::new("a"), "<document/>".to_string())
            .await
            .unwrap();
        channel
            .send_reply(&RequestId::new("b"), EMPTY_RESPONSE.to_string())
            .await
            .unwrap();

        let first = replies.recv().await.unwrap();
        assert_eq!(first.request_id.as_str(), "a");
        assert!(!first.is_empty_response());

        let second = replies.recv().await.unwrap();
        assert_eq!(second, FetchReply::empty(RequestId::new("b")));
        assert!(second.is_empty_response());
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (channel, replies) = MpscFetchChannel::new(1);
        drop(replies);

        let result = channel
            .send_reply(&RequestId::new("gone"), EMPTY_RESPONSE.to_string())
            .await;
        assert_eq!(result, Err(ChannelError::Closed));
    }
}
