#![allow(clippy::doc_markdown)] // Allow technical terms like FreeSWITCH, CIDR in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Config Fetch
//!
//! Media-server configuration fetch adapter for the telephony control plane.
//!
//! ## Overview
//!
//! The media server asks the control plane for configuration sections over its
//! fetch channel. This crate answers those fetches: it translates the external
//! configuration name into an internal key, looks the value up in the
//! configuration store, renders it as the XML document the media server
//! expects, and replies on the originating channel.
//!
//! Every dispatched fetch gets exactly one reply. When translation, lookup or
//! rendering fails, the reply is [`EMPTY_RESPONSE`].
//!
//! ## Module Organization
//!
//! - [`fetch`] - request model, key table, handler and listener loop
//! - [`store`] - configuration store seam and in-memory store
//! - [`render`] - renderer registry, ACL renderer and XML writer
//! - [`channel`] - reply channel seam and mpsc implementation
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - typed fetch, store and channel errors
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use config_fetch::channel::MpscFetchChannel;
//! use config_fetch::fetch::{ConfigFetchHandler, ConfigKey, FetchDisposition, FetchRequest, RequestId};
//! use config_fetch::store::InMemoryConfigStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = InMemoryConfigStore::new();
//! store.set(ConfigKey::Acls, json!({"acl_list": ["192.168.0.0/16 allow"]}));
//!
//! let (channel, mut replies) = MpscFetchChannel::new(16);
//! let handler = ConfigFetchHandler::new(Arc::new(store), Arc::new(channel));
//!
//! let request = FetchRequest::configuration(RequestId::new("R"), "acl.conf", vec![]);
//! if let FetchDisposition::Dispatched(task) = handler.on_fetch_event(request).await {
//!     task.await.unwrap();
//! }
//!
//! let reply = replies.recv().await.unwrap();
//! assert!(reply.document.contains("192.168.0.0/16"));
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod store;

pub use channel::{FetchChannel, FetchReply, MpscFetchChannel};
pub use config::{ConfigManager, FetchConfig};
pub use constants::EMPTY_RESPONSE;
pub use error::{ChannelError, FetchError, Result, StoreError};
pub use fetch::{
    ConfigFetchHandler, ConfigKey, DispatchOutcome, FetchDisposition, FetchEventListener,
    FetchRequest, PayloadEntry, RequestId,
};
pub use render::{DocumentRenderer, RendererRegistry};
pub use store::{ConfigStore, InMemoryConfigStore};
