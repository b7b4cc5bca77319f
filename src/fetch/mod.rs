//! Configuration fetch handling: request model, key translation, the handler
//! and the listener loop that drives it.

pub mod handler;
pub mod keys;
pub mod listener;
pub mod request;

pub use handler::{ConfigFetchHandler, DispatchOutcome, FetchDisposition, HandlerStats};
pub use keys::ConfigKey;
pub use listener::{
    FetchEventListener, FetchEventSender, ListenerController, ListenerControl, ListenerError,
    ListenerHandle, ListenerStats,
};
pub use request::{FetchRequest, PayloadEntry, RequestId};
