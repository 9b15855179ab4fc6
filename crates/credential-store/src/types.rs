//! Credential record types.

use serde::{Deserialize, Serialize};

/// Tokens the bot needs to talk to Discord and Plex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Discord bot token.
    #[serde(rename = "discordToken", alias = "DiscordToken", default)]
    pub discord_token: String,

    /// Plex credentials (empty until paired).
    #[serde(default)]
    pub plex: PlexCredentials,
}

/// Plex section of the credential record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlexCredentials {
    /// Plex auth token obtained through PIN pairing.
    #[serde(alias = "Token", default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Plex Media Server URL.
    #[serde(alias = "Host", default, skip_serializing_if = "String::is_empty")]
    pub host: String,
}

impl Credentials {
    /// Create a record holding only a Discord token.
    pub fn new(discord_token: impl Into<String>) -> Self {
        Self {
            discord_token: discord_token.into(),
            plex: PlexCredentials::default(),
        }
    }

    /// Whether a Plex token has been stored.
    pub fn has_plex_token(&self) -> bool {
        !self.plex.token.is_empty()
    }

    /// Override the Discord token when a non-empty value is given.
    pub fn with_discord_token(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.discord_token = token.to_string();
        }
        self
    }

    /// Fail unless a Discord token is present.
    pub fn require_discord_token(&self) -> Result<(), crate::CredentialError> {
        if self.discord_token.is_empty() {
            return Err(crate::CredentialError::DiscordTokenRequired);
        }
        Ok(())
    }
}
