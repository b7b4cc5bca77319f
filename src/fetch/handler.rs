//! # Config Fetch Handler
//!
//! Answers the media server's configuration fetches. Matching fetches
//! (`configuration`/`name`) are resolved on a detached task:
//!
//! 1. translate `conf_name` to a [`ConfigKey`];
//! 2. query the [`ConfigStore`];
//! 3. render with the renderer registered for the key;
//! 4. reply with the document, or with [`EMPTY_RESPONSE`] if any step failed.
//!
//! Failures end at the task boundary. The caller always gets exactly one reply
//! for a dispatched fetch, and nothing propagates back into the listener.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use crate::channel::FetchChannel;
use crate::config::{FetchConfig, HandlerConfig};
use crate::constants::EMPTY_RESPONSE;
use crate::error::{ChannelError, FetchError, Result};
use crate::fetch::keys::ConfigKey;
use crate::fetch::request::{FetchRequest, RequestId};
use crate::logging::log_fetch_operation;
use crate::render::RendererRegistry;
use crate::store::ConfigStore;

/// What `on_fetch_event` did with a fetch
#[derive(Debug)]
pub enum FetchDisposition {
    /// Resolution runs on the returned task
    Dispatched(JoinHandle<DispatchOutcome>),
    /// Answered inline with the empty response
    RepliedEmpty,
    /// Not ours; no reply sent
    Ignored,
}

/// How a dispatched task finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The rendered document was sent
    Rendered,
    /// Resolution failed and the empty response was sent instead
    EmptyResponse { error_kind: &'static str },
    /// The reply could not be delivered
    ReplyFailed,
}

/// Snapshot of handler counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerStats {
    pub dispatched: u64,
    pub rendered: u64,
    pub empty_responses: u64,
    pub ignored: u64,
    pub reply_failures: u64,
}

#[derive(Debug, Default)]
struct HandlerCounters {
    dispatched: AtomicU64,
    rendered: AtomicU64,
    empty_responses: AtomicU64,
    ignored: AtomicU64,
    reply_failures: AtomicU64,
}

impl HandlerCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> HandlerStats {
        HandlerStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            empty_responses: self.empty_responses.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            reply_failures: self.reply_failures.load(Ordering::Relaxed),
        }
    }
}

/// Translation, lookup and rendering, shared by every dispatched task
#[derive(Clone)]
struct FetchPipeline {
    store: Arc<dyn ConfigStore>,
    renderers: Arc<RendererRegistry>,
}

impl FetchPipeline {
    /// Resolve a document, turning a panicking store or renderer into an error
    async fn resolve(&self, conf_name: &str) -> Result<String> {
        match AssertUnwindSafe(self.resolve_unguarded(conf_name))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(FetchError::resolver_panic(
                conf_name,
                panic_message(&*payload),
            )),
        }
    }

    async fn resolve_unguarded(&self, conf_name: &str) -> Result<String> {
        let key = ConfigKey::from_conf_name(conf_name)?;

        let value = self
            .store
            .query(key)
            .await
            .map_err(|source| FetchError::LookupFailure { key, source })?;

        self.renderers.render(key, &value)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handler bound to one fetch channel
#[derive(Clone)]
pub struct ConfigFetchHandler {
    pipeline: FetchPipeline,
    channel: Arc<dyn FetchChannel>,
    call_id: Arc<str>,
    log_ignored_events: bool,
    inline_reply_timeout: Duration,
    counters: Arc<HandlerCounters>,
}

impl ConfigFetchHandler {
    /// Create a handler with the standard renderers and default settings
    pub fn new(store: Arc<dyn ConfigStore>, channel: Arc<dyn FetchChannel>) -> Self {
        Self::with_parts(
            store,
            Arc::new(RendererRegistry::default()),
            channel,
            &HandlerConfig::default(),
        )
    }

    /// Create a handler from loaded configuration
    pub fn from_config(
        config: &FetchConfig,
        store: Arc<dyn ConfigStore>,
        channel: Arc<dyn FetchChannel>,
    ) -> Self {
        Self::with_parts(
            store,
            Arc::new(RendererRegistry::from_config(config)),
            channel,
            &config.handler,
        )
    }

    pub fn with_parts(
        store: Arc<dyn ConfigStore>,
        renderers: Arc<RendererRegistry>,
        channel: Arc<dyn FetchChannel>,
        config: &HandlerConfig,
    ) -> Self {
        debug!(
            call_id = %config.call_id,
            store = store.store_name(),
            "Creating config fetch handler"
        );

        Self {
            pipeline: FetchPipeline { store, renderers },
            channel,
            call_id: Arc::from(config.call_id.as_str()),
            log_ignored_events: config.log_ignored_events,
            inline_reply_timeout: Duration::from_millis(config.inline_reply_timeout_ms),
            counters: Arc::new(HandlerCounters::default()),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn stats(&self) -> HandlerStats {
        self.counters.snapshot()
    }

    /// Handle one inbound fetch event
    ///
    /// Never waits on dispatched work. The inline empty reply is the only
    /// await on this path and gives up after `inline_reply_timeout_ms` when
    /// the reply queue has no room.
    pub async fn on_fetch_event(&self, request: FetchRequest) -> FetchDisposition {
        if request.is_configuration_by_name() {
            return FetchDisposition::Dispatched(self.dispatch(request));
        }

        if request.has_empty_payload() {
            if self.log_ignored_events {
                log_fetch_operation(
                    "fetch_ignored",
                    &request.request_id,
                    &request.conf_name,
                    "empty_response",
                    Some(format!("section={} key={}", request.section, request.key).as_str()),
                );
            }

            HandlerCounters::bump(&self.counters.empty_responses);
            if let Err(e) = self.send_inline_empty(&request.request_id).await {
                HandlerCounters::bump(&self.counters.reply_failures);
                warn!(request_id = %request.request_id, error = %e, "Failed to send empty reply");
            }
            return FetchDisposition::RepliedEmpty;
        }

        HandlerCounters::bump(&self.counters.ignored);
        FetchDisposition::Ignored
    }

    async fn send_inline_empty(
        &self,
        request_id: &RequestId,
    ) -> std::result::Result<(), ChannelError> {
        let send = self
            .channel
            .send_reply(request_id, EMPTY_RESPONSE.to_string());

        match tokio::time::timeout(self.inline_reply_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Rejected {
                reason: format!(
                    "no reply capacity within {}ms",
                    self.inline_reply_timeout.as_millis()
                ),
            }),
        }
    }

    /// Run translation, lookup and rendering without replying
    pub async fn resolve_document(&self, request: &FetchRequest) -> Result<String> {
        self.pipeline.resolve(&request.conf_name).await
    }

    fn dispatch(&self, request: FetchRequest) -> JoinHandle<DispatchOutcome> {
        HandlerCounters::bump(&self.counters.dispatched);

        let span = info_span!(
            "config_fetch",
            call_id = %self.call_id,
            request_id = %request.request_id,
            conf_name = %request.conf_name,
        );

        let pipeline = self.pipeline.clone();
        let channel = Arc::clone(&self.channel);
        let counters = Arc::clone(&self.counters);

        tokio::spawn(
            async move {
                let FetchRequest {
                    request_id,
                    conf_name,
                    ..
                } = request;

                let (document, outcome) = match pipeline.resolve(&conf_name).await {
                    Ok(document) => {
                        HandlerCounters::bump(&counters.rendered);
                        log_fetch_operation(
                            "fetch_resolved",
                            &request_id,
                            &conf_name,
                            "rendered",
                            None,
                        );
                        (document, DispatchOutcome::Rendered)
                    }
                    Err(e) => {
                        HandlerCounters::bump(&counters.empty_responses);
                        log_fetch_operation(
                            "fetch_resolved",
                            &request_id,
                            &conf_name,
                            e.kind(),
                            Some(e.to_string().as_str()),
                        );
                        (
                            EMPTY_RESPONSE.to_string(),
                            DispatchOutcome::EmptyResponse {
                                error_kind: e.kind(),
                            },
                        )
                    }
                };

                reply(channel.as_ref(), &counters, &request_id, document, outcome).await
            }
            .instrument(span),
        )
    }
}

async fn reply(
    channel: &dyn FetchChannel,
    counters: &HandlerCounters,
    request_id: &RequestId,
    document: String,
    outcome: DispatchOutcome,
) -> DispatchOutcome {
    match channel.send_reply(request_id, document).await {
        Ok(()) => outcome,
        Err(e) => {
            HandlerCounters::bump(&counters.reply_failures);
            warn!(error = %e, "Failed to deliver fetch reply");
            DispatchOutcome::ReplyFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{FetchReply, MpscFetchChannel};
    use crate::fetch::request::PayloadEntry;
    use crate::store::InMemoryConfigStore;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn handler_with_acls() -> (ConfigFetchHandler, mpsc::Receiver<FetchReply>) {
        let store = InMemoryConfigStore::new();
        store.set(ConfigKey::Acls, json!({"acl_list": ["192.168.0.0/16 allow"]}));
        let (channel, replies) = MpscFetchChannel::new(8);
        (
            ConfigFetchHandler::new(Arc::new(store), Arc::new(channel)),
            replies,
        )
    }

    #[tokio::test]
    async fn test_dispatched_fetch_renders_acls() {
        let (handler, mut replies) = handler_with_acls();
        let request = FetchRequest::configuration(RequestId::new("R"), "acl.conf", vec![]);

        let outcome = match handler.on_fetch_event(request).await {
            FetchDisposition::Dispatched(task) => task.await.unwrap(),
            other => panic!("Expected dispatch, got {other:?}"),
        };
        assert_eq!(outcome, DispatchOutcome::Rendered);

        let reply = replies.recv().await.unwrap();
        assert_eq!(reply.request_id.as_str(), "R");
        assert!(reply.document.contains(r#"cidr="192.168.0.0/16""#));

        let stats = handler.stats();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.rendered, 1);
    }

    #[tokio::test]
    async fn test_unmapped_conf_name_gets_empty_response() {
        let (handler, mut replies) = handler_with_acls();
        let request = FetchRequest::configuration(RequestId::new("R"), "bogus.conf", vec![]);

        let FetchDisposition::Dispatched(task) = handler.on_fetch_event(request).await else {
            panic!("Expected dispatch");
        };
        assert_eq!(
            task.await.unwrap(),
            DispatchOutcome::EmptyResponse {
                error_kind: "unmapped_key"
            }
        );
        assert!(replies.recv().await.unwrap().is_empty_response());
    }

    #[tokio::test]
    async fn test_other_fetch_with_payload_is_ignored() {
        let (handler, mut replies) = handler_with_acls();
        let request = FetchRequest::new(
            RequestId::new("D"),
            "directory",
            "domain",
            "",
            vec![PayloadEntry::new("Event-Name", "REQUEST_PARAMS")],
        );

        assert!(matches!(
            handler.on_fetch_event(request).await,
            FetchDisposition::Ignored
        ));
        assert!(replies.try_recv().is_err());
        assert_eq!(handler.stats().ignored, 1);
    }

    #[tokio::test]
    async fn test_resolve_document_reports_lookup_failure() {
        let (channel, _replies) = MpscFetchChannel::new(1);
        let handler =
            ConfigFetchHandler::new(Arc::new(InMemoryConfigStore::new()), Arc::new(channel));
        let request = FetchRequest::configuration(RequestId::new("R"), "acl.conf", vec![]);

        assert!(matches!(
            handler.resolve_document(&request).await,
            Err(FetchError::LookupFailure {
                key: ConfigKey::Acls,
                ..
            })
        ));
    }
}
