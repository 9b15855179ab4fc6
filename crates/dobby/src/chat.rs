//! Outbound chat operations used by command handlers.

use async_trait::async_trait;
use discord_client::{DiscordClient, DiscordError};

/// The chat operations handlers need: post text, list and delete messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post `text` to a channel.
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), DiscordError>;

    /// Ids of up to `limit` recent messages, newest first.
    async fn message_ids(
        &self,
        channel_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<String>, DiscordError>;

    /// Delete the given messages.
    async fn bulk_delete(&self, channel_id: &str, message_ids: &[String])
        -> Result<(), DiscordError>;
}

#[async_trait]
impl ChatSink for DiscordClient {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), DiscordError> {
        DiscordClient::send(self, channel_id, text).await
    }

    async fn message_ids(
        &self,
        channel_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<String>, DiscordError> {
        DiscordClient::message_ids(self, channel_id, limit).await
    }

    async fn bulk_delete(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<(), DiscordError> {
        DiscordClient::bulk_delete(self, channel_id, message_ids).await
    }
}

/// Post a message, logging instead of failing when delivery fails.
pub async fn say(chat: &dyn ChatSink, channel_id: &str, text: &str) {
    if let Err(e) = chat.send(channel_id, text).await {
        tracing::warn!("Failed to send message to channel {}: {}", channel_id, e);
    }
}
