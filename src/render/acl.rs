//! # ACL document rendering
//!
//! Converts the store's ACL value into the media server's `acl.conf`
//! network-list document. Two value shapes are accepted and may be mixed:
//!
//! - `{"acl_list": ["192.168.0.0/16 allow", ...]}`, placed in the default list;
//! - named entries, `{"office": {"type": "allow", "cidr": "10.1.0.0/16",
//!   "network-list-name": "trusted"}}`, where `cidr` may also be an array.
//!
//! ```rust
//! use config_fetch::config::AclConfig;
//! use config_fetch::render::{AclRenderer, DocumentRenderer};
//! use serde_json::json;
//!
//! let renderer = AclRenderer::new(AclConfig::default());
//! let xml = renderer.render(&json!({"acl_list": ["192.168.0.0/16 allow"]})).unwrap();
//! assert!(xml.contains(r#"<node type="allow" cidr="192.168.0.0/16" />"#));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::xml::XmlWriter;
use super::{DocumentRenderer, RenderError};
use crate::config::AclConfig;
use crate::constants::{self, acl as acl_consts, conf_names};

/// Verdict applied by a node, or by a list when no node matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclPolicy {
    Allow,
    Deny,
}

impl AclPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AclPolicy::Allow => "allow",
            AclPolicy::Deny => "deny",
        }
    }
}

impl fmt::Display for AclPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AclPolicy {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(AclPolicy::Allow),
            "deny" => Ok(AclPolicy::Deny),
            other => Err(RenderError::new(format!("unknown ACL policy '{other}'"))),
        }
    }
}

/// Validated `address/prefix` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cidr {
    addr: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

/// Bare addresses are accepted and widened to a host block (`/32` or `/128`)
impl FromStr for Cidr {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| RenderError::new(format!("invalid CIDR address '{s}'")))?;
        let max_prefix = if addr.is_ipv4() { 32 } else { 128 };

        let prefix = match prefix_part {
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .filter(|prefix| *prefix <= max_prefix)
                .ok_or_else(|| RenderError::new(format!("invalid CIDR prefix in '{s}'")))?,
            None => max_prefix,
        };

        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclNode {
    pub policy: AclPolicy,
    pub cidr: Cidr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkList {
    pub default: AclPolicy,
    pub nodes: Vec<AclNode>,
}

/// Parsed ACL configuration, lists ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclDocument {
    lists: BTreeMap<String, NetworkList>,
}

impl AclDocument {
    /// Parse the store's ACL value
    pub fn from_value(value: &Value, config: &AclConfig) -> Result<Self, RenderError> {
        let object = value
            .as_object()
            .ok_or_else(|| RenderError::new("ACL value must be an object"))?;

        let mut document = Self::default();

        if let Some(entries) = object.get(acl_consts::ACL_LIST_FIELD) {
            let entries = entries
                .as_array()
                .ok_or_else(|| RenderError::new("acl_list must be an array of strings"))?;
            for entry in entries {
                let line = entry
                    .as_str()
                    .ok_or_else(|| RenderError::new("acl_list entries must be strings"))?;
                let node = Self::parse_list_line(line)?;
                document.push(&config.default_list_name, node, config);
            }
        }

        // serde_json's map iterates in key order
        for (name, entry) in object {
            if name == acl_consts::ACL_LIST_FIELD {
                continue;
            }
            let entry = entry
                .as_object()
                .ok_or_else(|| RenderError::new(format!("ACL entry '{name}' must be an object")))?;
            document.push_named_entry(name, entry, config)?;
        }

        Ok(document)
    }

    pub fn lists(&self) -> impl Iterator<Item = (&str, &NetworkList)> {
        self.lists.iter().map(|(name, list)| (name.as_str(), list))
    }

    pub fn list(&self, name: &str) -> Option<&NetworkList> {
        self.lists.get(name)
    }

    /// Render the `acl.conf` configuration document
    pub fn to_xml(&self) -> String {
        let mut writer = XmlWriter::new();
        writer
            .open("document", &[("type", constants::DOCUMENT_TYPE)])
            .open("section", &[("name", constants::CONFIGURATION_SECTION)])
            .open(
                "configuration",
                &[
                    ("name", conf_names::ACL_CONF),
                    ("description", acl_consts::DESCRIPTION),
                ],
            )
            .open("network-lists", &[]);

        for (name, list) in &self.lists {
            writer.open(
                "list",
                &[("name", name.as_str()), ("default", list.default.as_str())],
            );
            for node in &list.nodes {
                let cidr = node.cidr.to_string();
                writer.empty(
                    "node",
                    &[("type", node.policy.as_str()), ("cidr", cidr.as_str())],
                );
            }
            writer.close();
        }

        writer.finish()
    }

    /// `"<cidr> <allow|deny>"`
    fn parse_list_line(line: &str) -> Result<AclNode, RenderError> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(cidr), Some(policy), None) => Ok(AclNode {
                policy: policy.parse()?,
                cidr: cidr.parse()?,
            }),
            _ => Err(RenderError::new(format!(
                "acl_list entry '{line}' must be '<cidr> <allow|deny>'"
            ))),
        }
    }

    fn push_named_entry(
        &mut self,
        name: &str,
        entry: &Map<String, Value>,
        config: &AclConfig,
    ) -> Result<(), RenderError> {
        let policy: AclPolicy = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::new(format!("ACL entry '{name}' is missing 'type'")))?
            .parse()?;

        let list_name = match entry.get(acl_consts::NETWORK_LIST_FIELD) {
            Some(Value::String(list)) if !list.trim().is_empty() => list.as_str(),
            Some(Value::String(_)) | None => config.default_list_name.as_str(),
            Some(_) => {
                return Err(RenderError::new(format!(
                    "ACL entry '{name}' has a non-string network-list-name"
                )))
            }
        };

        let cidrs: Vec<&str> = match entry.get("cidr") {
            Some(Value::String(cidr)) => vec![cidr.as_str()],
            Some(Value::Array(cidrs)) => cidrs
                .iter()
                .map(|cidr| {
                    cidr.as_str().ok_or_else(|| {
                        RenderError::new(format!("ACL entry '{name}' has a non-string cidr"))
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(RenderError::new(format!(
                    "ACL entry '{name}' is missing 'cidr'"
                )))
            }
        };

        for cidr in cidrs {
            let node = AclNode {
                policy,
                cidr: cidr.parse()?,
            };
            self.push(list_name, node, config);
        }

        Ok(())
    }

    fn push(&mut self, list_name: &str, node: AclNode, config: &AclConfig) {
        self.lists
            .entry(list_name.to_string())
            .or_insert_with(|| NetworkList {
                default: config.policy_for(list_name),
                nodes: Vec::new(),
            })
            .nodes
            .push(node);
    }
}

/// Renderer registered for [`ConfigKey::Acls`](crate::fetch::keys::ConfigKey::Acls)
#[derive(Debug, Clone, Default)]
pub struct AclRenderer {
    config: AclConfig,
}

impl AclRenderer {
    pub fn new(config: AclConfig) -> Self {
        Self { config }
    }
}

impl DocumentRenderer for AclRenderer {
    fn render(&self, value: &Value) -> Result<String, RenderError> {
        AclDocument::from_value(value, &self.config).map(|document| document.to_xml())
    }

    fn renderer_name(&self) -> &str {
        "acl_xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: Value) -> Result<String, RenderError> {
        AclRenderer::default().render(&value)
    }

    #[test]
    fn test_acl_list_renders_into_default_list() {
        let xml = render(json!({"acl_list": ["192.168.0.0/16 allow"]})).unwrap();

        assert_eq!(
            xml,
            concat!(
                r#"<document type="freeswitch/xml">"#,
                r#"<section name="configuration">"#,
                r#"<configuration name="acl.conf" description="Network List">"#,
                r#"<network-lists>"#,
                r#"<list name="trusted" default="deny">"#,
                r#"<node type="allow" cidr="192.168.0.0/16" />"#,
                r#"</list>"#,
                r#"</network-lists>"#,
                r#"</configuration>"#,
                r#"</section>"#,
                r#"</document>"#,
            )
        );
    }

    #[test]
    fn test_named_entries_group_by_list() {
        let value = json!({
            "acl_list": ["10.0.0.0/8 deny"],
            "carrier_a": {"type": "allow", "cidr": ["203.0.113.10", "198.51.100.0/24"], "network-list-name": "carriers"},
            "office": {"type": "allow", "cidr": "172.16.0.0/12"}
        });

        let mut config = AclConfig::default();
        config.list_defaults.insert("carriers".to_string(), AclPolicy::Deny);
        let document = AclDocument::from_value(&value, &config).unwrap();

        let names: Vec<&str> = document.lists().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["carriers", "trusted"]);

        let carriers = document.list("carriers").unwrap();
        assert_eq!(carriers.nodes.len(), 2);
        assert_eq!(carriers.nodes[0].cidr.to_string(), "203.0.113.10/32");

        let trusted = document.list("trusted").unwrap();
        assert_eq!(trusted.nodes[0].policy, AclPolicy::Deny);
        assert_eq!(trusted.nodes[1].cidr.to_string(), "172.16.0.0/12");
    }

    #[test]
    fn test_list_default_comes_from_config() {
        let mut config = AclConfig::default();
        config.list_defaults.insert("trusted".to_string(), AclPolicy::Allow);

        let xml = AclRenderer::new(config)
            .render(&json!({"acl_list": ["::1 allow"]}))
            .unwrap();
        assert!(xml.contains(r#"<list name="trusted" default="allow">"#));
        assert!(xml.contains(r#"cidr="::1/128""#));
    }

    #[test]
    fn test_empty_object_renders_empty_network_lists() {
        let xml = render(json!({})).unwrap();
        assert!(xml.contains("<network-lists></network-lists>"));
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(render(json!(["192.168.0.0/16 allow"])).is_err());
        assert!(render(json!({"acl_list": "192.168.0.0/16 allow"})).is_err());
        assert!(render(json!({"acl_list": ["192.168.0.0/16"]})).is_err());
        assert!(render(json!({"acl_list": ["192.168.0.0/33 allow"]})).is_err());
        assert!(render(json!({"acl_list": ["not-an-ip allow"]})).is_err());
        assert!(render(json!({"acl_list": ["10.0.0.0/8 maybe"]})).is_err());
        assert!(render(json!({"office": {"cidr": "10.0.0.0/8"}})).is_err());
        assert!(render(json!({"office": {"type": "allow"}})).is_err());
        assert!(render(json!({"office": "10.0.0.0/8 allow"})).is_err());
    }

    #[test]
    fn test_policy_parsing_is_case_insensitive() {
        assert_eq!("ALLOW".parse::<AclPolicy>().unwrap(), AclPolicy::Allow);
        assert_eq!(" deny ".parse::<AclPolicy>().unwrap(), AclPolicy::Deny);
    }
}
