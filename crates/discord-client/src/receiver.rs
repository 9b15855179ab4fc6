//! Message receiver with polling.

use crate::client::DiscordClient;
use crate::types::*;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::{debug, error, info};

/// Maximum page size accepted by the messages endpoint.
const PAGE_SIZE: u32 = 100;

/// Message receiver that polls watched channels for new messages.
pub struct MessageReceiver {
    client: DiscordClient,
    channels: Vec<String>,
    poll_interval: Duration,
}

impl MessageReceiver {
    /// Create a new message receiver.
    pub fn new(client: DiscordClient, channels: Vec<String>, poll_interval: Duration) -> Self {
        Self {
            client,
            channels,
            poll_interval,
        }
    }

    /// Start receiving messages as an async stream.
    ///
    /// Only messages posted after the stream starts are yielded, oldest
    /// first within each channel.
    pub fn stream(self) -> impl Stream<Item = BotMessage> {
        async_stream::stream! {
            // Channels absent from the map have no baseline yet and are not
            // polled for new messages until one is fetched.
            let mut last_seen: HashMap<String, Option<String>> = HashMap::new();

            for channel in &self.channels {
                if let Some(newest) = self.baseline(channel).await {
                    info!("Watching channel {}", channel);
                    last_seen.insert(channel.clone(), newest);
                }
            }

            loop {
                for channel in &self.channels {
                    let Some(after) = last_seen.get(channel).cloned() else {
                        if let Some(newest) = self.baseline(channel).await {
                            info!("Watching channel {}", channel);
                            last_seen.insert(channel.clone(), newest);
                        }
                        continue;
                    };

                    match self.client.messages(channel, Some(PAGE_SIZE), after.as_deref()).await {
                        Ok(mut messages) => {
                            messages.sort_by_key(|m| snowflake(&m.id));

                            if let Some(newest) = messages.last() {
                                last_seen.insert(channel.clone(), Some(newest.id.clone()));
                            }

                            for msg in messages {
                                if let Some(bot_msg) = BotMessage::from_message(&msg) {
                                    debug!("Received: {} from {}",
                                        bot_msg.text.chars().take(50).collect::<String>(),
                                        bot_msg.author_name
                                    );
                                    yield bot_msg;
                                }
                            }
                        }
                        Err(e) => {
                            error!("Receive error on channel {}: {}", channel, e);
                            // Back off on error
                            sleep(Duration::from_secs(5)).await;
                        }
                    }
                }

                sleep(self.poll_interval).await;
            }
        }
    }

    /// Id of the newest message already in `channel`.
    ///
    /// `Some(None)` is an empty channel; `None` means the lookup failed.
    async fn baseline(&self, channel: &str) -> Option<Option<String>> {
        match self.client.messages(channel, Some(1), None).await {
            Ok(messages) => Some(messages.into_iter().next().map(|m| m.id)),
            Err(e) => {
                error!("Failed to read channel {}: {}", channel, e);
                None
            }
        }
    }
}
