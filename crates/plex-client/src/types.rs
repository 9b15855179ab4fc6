//! Request and response types for the plex.tv API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A pairing PIN issued by plex.tv.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlexPin {
    pub id: u64,
    pub code: String,
    #[serde(default)]
    pub client_identifier: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl PlexPin {
    /// Build a PIN by hand (used when replaying a known request).
    pub fn new(id: u64, code: impl Into<String>, client_identifier: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            client_identifier: client_identifier.into(),
            expires_at: None,
            auth_token: None,
        }
    }
}

/// A device entry from `/api/v2/resources`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexResource {
    pub name: String,
    #[serde(default)]
    pub provides: String,
    #[serde(default)]
    pub connections: Vec<PlexConnection>,
}

/// One way of reaching a resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexConnection {
    pub uri: String,
    #[serde(default)]
    pub local: bool,
}

impl PlexResource {
    /// Whether this resource is a Plex Media Server.
    pub fn is_server(&self) -> bool {
        self.provides.split(',').any(|p| p.trim() == "server")
    }

    /// Preferred connection URI: remote first, then local.
    pub fn preferred_uri(&self) -> Option<&str> {
        self.connections
            .iter()
            .find(|c| !c.local)
            .or_else(|| self.connections.first())
            .map(|c| c.uri.as_str())
    }
}
