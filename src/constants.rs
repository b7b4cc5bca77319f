//! # Fetch Protocol Constants
//!
//! Section names, binding keys and fixed documents exchanged with the media
//! server over the configuration fetch channel.

/// Section name carried by configuration fetch events
pub const CONFIGURATION_SECTION: &str = "configuration";

/// Binding key that identifies a configuration-by-name fetch
pub const NAME_KEY: &str = "name";

/// Document type attribute the media server expects on every reply
pub const DOCUMENT_TYPE: &str = "freeswitch/xml";

/// Reply sent whenever a fetch cannot be answered with real configuration
pub const EMPTY_RESPONSE: &str = "<document type=\"freeswitch/xml\"><section name=\"result\"><result status=\"not found\" /></section></document>";

/// External configuration names and their internal counterparts
pub mod conf_names {
    pub const ACL_CONF: &str = "acl.conf";
    pub const ACLS: &str = "acls";
}

/// Defaults for ACL rendering
pub mod acl {
    pub const DEFAULT_LIST_NAME: &str = "trusted";
    pub const ACL_LIST_FIELD: &str = "acl_list";
    pub const NETWORK_LIST_FIELD: &str = "network-list-name";
    pub const DESCRIPTION: &str = "Network List";
}
