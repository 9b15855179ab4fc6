//! Discord REST API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Discord user (or bot) account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// A channel message as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: User,
    #[serde(default)]
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outgoing message request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub content: String,
}

/// Bulk delete request.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteRequest {
    pub messages: Vec<String>,
}

/// Parsed message for bot processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotMessage {
    /// Message snowflake.
    pub id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Author's user id.
    pub author_id: String,
    /// Author's username.
    pub author_name: String,
    /// The message text.
    pub text: String,
}

impl BotMessage {
    /// Extract a bot message from a REST message. Empty messages are skipped.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if msg.content.is_empty() {
            return None;
        }

        Some(Self {
            id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            author_id: msg.author.id.clone(),
            author_name: msg.author.username.clone(),
            text: msg.content.clone(),
        })
    }
}

/// Numeric value of a snowflake id, used for ordering.
pub fn snowflake(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}
