//! Fetch event listener
//!
//! Owns the handler and processes fetch events and control messages in
//! arrival order on a single task. Dispatched work is never awaited here, so
//! a slow lookup cannot hold up later fetches or a shutdown.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::handler::{ConfigFetchHandler, FetchDisposition, HandlerStats};
use super::request::FetchRequest;
use crate::error::ChannelError;

const CONTROL_BUFFER_SIZE: usize = 16;

/// Messages that steer the listener loop
#[derive(Debug)]
pub enum ListenerControl {
    /// Stop after the message currently being processed
    Shutdown,
    /// Report current statistics
    Stats(oneshot::Sender<ListenerStats>),
}

/// Statistics about the listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub events_received: u64,
    pub dispatched: u64,
    pub replied_empty: u64,
    pub ignored: u64,
    pub handler: HandlerStats,
}

/// Listener errors
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Listener has already stopped")]
    Stopped,

    #[error("Listener task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Inbound side handed to the integration layer
#[derive(Debug, Clone)]
pub struct FetchEventSender {
    sender: mpsc::Sender<FetchRequest>,
}

impl FetchEventSender {
    pub async fn send(&self, request: FetchRequest) -> Result<(), ChannelError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

/// Sends control messages to a running listener
#[derive(Debug, Clone)]
pub struct ListenerController {
    sender: mpsc::Sender<ListenerControl>,
}

impl ListenerController {
    pub async fn shutdown(&self) -> Result<(), ListenerError> {
        self.sender
            .send(ListenerControl::Shutdown)
            .await
            .map_err(|_| ListenerError::Stopped)
    }

    pub async fn stats(&self) -> Result<ListenerStats, ListenerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ListenerControl::Stats(reply_tx))
            .await
            .map_err(|_| ListenerError::Stopped)?;
        reply_rx.await.map_err(|_| ListenerError::Stopped)
    }
}

/// Handle to a listener started with [`FetchEventListener::start`]
#[derive(Debug)]
pub struct ListenerHandle {
    controller: ListenerController,
    task: JoinHandle<ListenerStats>,
}

impl ListenerHandle {
    pub fn controller(&self) -> ListenerController {
        self.controller.clone()
    }

    /// Ask the listener to stop and wait for its final statistics
    pub async fn shutdown(self) -> Result<ListenerStats, ListenerError> {
        // The loop may already have ended because every event sender was dropped
        if self.controller.shutdown().await.is_err() {
            debug!("Listener already stopped before shutdown request");
        }
        self.join().await
    }

    /// Wait for the listener to end on its own
    pub async fn join(self) -> Result<ListenerStats, ListenerError> {
        self.task.await.map_err(|e| ListenerError::TaskFailed {
            reason: e.to_string(),
        })
    }
}

pub struct FetchEventListener {
    handler: ConfigFetchHandler,
    events: mpsc::Receiver<FetchRequest>,
    control_tx: mpsc::Sender<ListenerControl>,
    control_rx: mpsc::Receiver<ListenerControl>,
}

impl FetchEventListener {
    /// Create a listener with a bounded inbound buffer
    pub fn new(handler: ConfigFetchHandler, buffer_size: usize) -> (Self, FetchEventSender) {
        let (sender, events) = mpsc::channel(buffer_size);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);

        let listener = Self {
            handler,
            events,
            control_tx,
            control_rx,
        };
        (listener, FetchEventSender { sender })
    }

    pub fn controller(&self) -> ListenerController {
        ListenerController {
            sender: self.control_tx.clone(),
        }
    }

    /// Spawn the loop in a background task
    pub fn start(self) -> ListenerHandle {
        let controller = self.controller();
        let task = tokio::spawn(self.run());
        ListenerHandle { controller, task }
    }

    /// Run the loop in the current task until shutdown or until every event
    /// sender is dropped
    #[instrument(skip(self), fields(call_id = %self.handler.call_id()))]
    pub async fn run(self) -> ListenerStats {
        let Self {
            handler,
            mut events,
            control_tx,
            mut control_rx,
        } = self;
        // Held so the control queue stays open for the life of the loop
        let _control_tx = control_tx;

        let mut stats = ListenerStats::default();
        info!("Starting config fetch listener loop");

        loop {
            tokio::select! {
                biased;

                Some(control) = control_rx.recv() => match control {
                    ListenerControl::Shutdown => {
                        info!("Shutdown requested");
                        break;
                    }
                    ListenerControl::Stats(reply) => {
                        stats.handler = handler.stats();
                        if reply.send(stats.clone()).is_err() {
                            warn!("Stats requester went away before the reply");
                        }
                    }
                },

                event = events.recv() => match event {
                    Some(request) => {
                        stats.events_received += 1;
                        debug!(
                            request_id = %request.request_id,
                            section = %request.section,
                            key = %request.key,
                            "Received fetch event"
                        );

                        match handler.on_fetch_event(request).await {
                            FetchDisposition::Dispatched(_) => stats.dispatched += 1,
                            FetchDisposition::RepliedEmpty => stats.replied_empty += 1,
                            FetchDisposition::Ignored => stats.ignored += 1,
                        }
                    }
                    None => {
                        info!("Fetch event channel closed");
                        break;
                    }
                },
            }
        }

        stats.handler = handler.stats();
        info!(
            events_received = stats.events_received,
            dispatched = stats.dispatched,
            "Config fetch listener loop ended"
        );
        stats
    }
}
