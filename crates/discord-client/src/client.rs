//! Discord HTTP client.

use crate::error::DiscordError;
use crate::types::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Discord REST endpoint.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Discord REST API client authenticated as a bot.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl DiscordClient {
    /// Create a new Discord client.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, DiscordError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: SecretString::new(token.into()),
        })
    }

    /// Check that the API is reachable and the token is valid.
    pub async fn health_check(&self) -> bool {
        self.current_user().await.is_ok()
    }

    /// Get the bot's own user.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, DiscordError> {
        let response = self
            .authorized(self.client.get(format!("{}/users/@me", self.base_url)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch recent messages in a channel, newest first.
    #[instrument(skip(self))]
    pub async fn messages(
        &self,
        channel_id: &str,
        limit: Option<u32>,
        after: Option<&str>,
    ) -> Result<Vec<Message>, DiscordError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .authorized(
                self.client
                    .get(format!("{}/channels/{}/messages", self.base_url, channel_id))
                    .query(&query),
            )
            .send()
            .await?;

        let messages: Vec<Message> = self.handle_response(response).await?;
        debug!("Fetched {} messages", messages.len());
        Ok(messages)
    }

    /// Ids of up to `limit` recent messages in a channel.
    pub async fn message_ids(
        &self,
        channel_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<String>, DiscordError> {
        Ok(self
            .messages(channel_id, limit, None)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    /// Send a message to a channel.
    #[instrument(skip(self, message))]
    pub async fn send(&self, channel_id: &str, message: &str) -> Result<(), DiscordError> {
        let request = CreateMessageRequest {
            content: message.to_string(),
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/channels/{}/messages", self.base_url, channel_id))
                    .json(&request),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Send failed: {}", msg);
            return Err(DiscordError::SendFailed(msg));
        }

        debug!("Sent message to channel {}", channel_id);
        Ok(())
    }

    /// Delete messages in a channel.
    ///
    /// A single id is deleted directly since the bulk endpoint needs two or
    /// more.
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn bulk_delete(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<(), DiscordError> {
        let response = match message_ids {
            [] => return Ok(()),
            [id] => {
                self.authorized(self.client.delete(format!(
                    "{}/channels/{}/messages/{}",
                    self.base_url, channel_id, id
                )))
                .send()
                .await?
            }
            ids => {
                let request = BulkDeleteRequest {
                    messages: ids.to_vec(),
                };
                self.authorized(
                    self.client
                        .post(format!(
                            "{}/channels/{}/messages/bulk-delete",
                            self.base_url, channel_id
                        ))
                        .json(&request),
                )
                .send()
                .await?
            }
        };

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        debug!("Deleted {} messages in {}", message_ids.len(), channel_id);
        Ok(())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(
            "Authorization",
            format!("Bot {}", self.token.expose_secret()),
        )
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, DiscordError> {
        if response.status().is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(DiscordError::from)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract error information from failed response.
    async fn extract_error(&self, response: reqwest::Response) -> DiscordError {
        match response.status() {
            StatusCode::UNAUTHORIZED => {
                warn!("Discord rejected the bot token");
                DiscordError::Unauthorized
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Discord rate limit hit");
                DiscordError::RateLimited
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                DiscordError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }
}
