//! Closed translation table between the media server's configuration names
//! and the keys understood by the internal configuration store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::conf_names;
use crate::error::{FetchError, Result};

/// Internal configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    /// Network access-control lists, fetched by the media server as `acl.conf`
    Acls,
}

impl ConfigKey {
    /// Every key in the table
    pub const ALL: [ConfigKey; 1] = [ConfigKey::Acls];

    /// Translate an external configuration name into an internal key
    pub fn from_conf_name(conf_name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.conf_name() == conf_name)
            .ok_or_else(|| FetchError::unmapped_key(conf_name))
    }

    /// Name used by the internal configuration store
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Acls => conf_names::ACLS,
        }
    }

    /// Name the media server uses when fetching this configuration
    pub fn conf_name(&self) -> &'static str {
        match self {
            ConfigKey::Acls => conf_names::ACL_CONF,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the internal name (`"acls"`), not the external one
impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown internal configuration key '{s}'"))
    }
}
