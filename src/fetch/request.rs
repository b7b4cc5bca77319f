//! # Fetch request model
//!
//! Inbound configuration fetch events as delivered by the media server
//! integration channel. A request is immutable and answered exactly once.
//!
//! ```rust
//! use config_fetch::fetch::{FetchRequest, PayloadEntry, RequestId};
//!
//! let request = FetchRequest::new(
//!     RequestId::new("b1e5c6f2"),
//!     "configuration",
//!     "name",
//!     "acl.conf",
//!     vec![PayloadEntry::new("Event-Name", "REQUEST_PARAMS")],
//! );
//!
//! assert!(request.is_configuration_by_name());
//! assert!(!request.has_empty_payload());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{CONFIGURATION_SECTION, NAME_KEY};

/// Opaque token identifying one fetch; echoed back on the reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    /// Fresh random token for callers that originate fetches themselves
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ordered `(name, value)` pair of the fetch payload
///
/// Serialized as a two-element JSON array: `["Event-Name", "REQUEST_PARAMS"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEntry(pub String, pub String);

impl PayloadEntry {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self(name.into(), value.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> &str {
        &self.1
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty() && self.1.is_empty()
    }
}

/// A configuration fetch pushed by the media server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub request_id: RequestId,
    pub section: String,
    pub key: String,
    pub conf_name: String,
    #[serde(default)]
    pub payload: Vec<PayloadEntry>,
}

impl FetchRequest {
    pub fn new<S, K, C>(
        request_id: RequestId,
        section: S,
        key: K,
        conf_name: C,
        payload: Vec<PayloadEntry>,
    ) -> Self
    where
        S: Into<String>,
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            request_id,
            section: section.into(),
            key: key.into(),
            conf_name: conf_name.into(),
            payload,
        }
    }

    /// Convenience constructor for the `configuration`/`name` fetch shape
    pub fn configuration<C: Into<String>>(
        request_id: RequestId,
        conf_name: C,
        payload: Vec<PayloadEntry>,
    ) -> Self {
        Self::new(request_id, CONFIGURATION_SECTION, NAME_KEY, conf_name, payload)
    }

    /// Whether this fetch asks for a configuration section by name
    pub fn is_configuration_by_name(&self) -> bool {
        self.section == CONFIGURATION_SECTION && self.key == NAME_KEY
    }

    /// True when the payload has no first element, or the first element is empty
    pub fn has_empty_payload(&self) -> bool {
        self.payload.first().map_or(true, PayloadEntry::is_empty)
    }

    /// Look up a payload value by name, first match wins
    pub fn payload_value(&self, name: &str) -> Option<&str> {
        self.payload
            .iter()
            .find(|entry| entry.name() == name)
            .map(PayloadEntry::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_detection() {
        let id = RequestId::new("r1");

        let none = FetchRequest::new(id.clone(), "directory", "domain", "", vec![]);
        assert!(none.has_empty_payload());

        let blank_first = FetchRequest::new(
            id.clone(),
            "directory",
            "domain",
            "",
            vec![PayloadEntry::new("", ""), PayloadEntry::new("a", "b")],
        );
        assert!(blank_first.has_empty_payload());

        let populated = FetchRequest::new(
            id,
            "directory",
            "domain",
            "",
            vec![PayloadEntry::new("Event-Name", "REQUEST_PARAMS")],
        );
        assert!(!populated.has_empty_payload());
    }

    #[test]
    fn test_configuration_by_name_requires_both_fields() {
        let id = RequestId::new("r2");
        assert!(FetchRequest::configuration(id.clone(), "acl.conf", vec![]).is_configuration_by_name());
        assert!(!FetchRequest::new(id.clone(), "configuration", "key", "acl.conf", vec![])
            .is_configuration_by_name());
        assert!(!FetchRequest::new(id, "dialplan", "name", "acl.conf", vec![])
            .is_configuration_by_name());
    }

    #[test]
    fn test_request_deserializes_payload_pairs() {
        let json = r#"{
            "request_id": "abc-123",
            "section": "configuration",
            "key": "name",
            "conf_name": "acl.conf",
            "payload": [["Event-Name", "REQUEST_PARAMS"], ["key_value", "acl.conf"]]
        }"#;

        let request: FetchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.request_id.as_str(), "abc-123");
        assert_eq!(request.payload.len(), 2);
        assert_eq!(request.payload_value("key_value"), Some("acl.conf"));
    }

    #[test]
    fn test_generated_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
