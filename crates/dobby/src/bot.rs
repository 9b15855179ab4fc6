//! Incoming message handling.

use crate::chat::{say, ChatSink};
use crate::commands::CommandRegistry;
use crate::router::{route, Route};
use discord_client::BotMessage;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Routes chat messages to registered commands.
pub struct Bot {
    keyword: String,
    bot_user_id: String,
    registry: Arc<CommandRegistry>,
    chat: Arc<dyn ChatSink>,
}

impl Bot {
    pub fn new(
        keyword: impl Into<String>,
        bot_user_id: impl Into<String>,
        registry: Arc<CommandRegistry>,
        chat: Arc<dyn ChatSink>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            bot_user_id: bot_user_id.into(),
            registry,
            chat,
        }
    }

    /// Handle one incoming message.
    #[instrument(skip(self, message), fields(channel_id = %message.channel_id, message_id = %message.id))]
    pub async fn handle(&self, message: &BotMessage) {
        debug!("{}", message.text);

        match route(&message.text, &message.author_id, &self.bot_user_id, &self.keyword) {
            Route::Ignored => {}
            Route::Help => {
                say(
                    self.chat.as_ref(),
                    &message.channel_id,
                    &self.registry.help_text(),
                )
                .await;
            }
            Route::Command { name, args } => {
                if !self.registry.is_registered(&name) {
                    say(self.chat.as_ref(), &message.channel_id, "invalid command").await;
                    return;
                }
                self.registry
                    .dispatch(&message.channel_id, &name, &args)
                    .await;
            }
        }
    }
}
