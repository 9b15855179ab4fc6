//! Clear command - bulk deletes recent channel messages.

use crate::chat::{say, ChatSink};
use crate::commands::CommandHandler;
use async_trait::async_trait;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{info, warn};

/// Most messages the channel history endpoint returns per request.
const MAX_CLEAR: u32 = 100;

pub struct ClearHandler {
    chat: Arc<dyn ChatSink>,
}

impl ClearHandler {
    pub fn new(chat: Arc<dyn ChatSink>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl CommandHandler for ClearHandler {
    fn name(&self) -> &str {
        "clear"
    }

    async fn execute(&self, channel_id: &str, args: &[String]) -> ControlFlow<()> {
        // `clear` takes an optional message count; without it (or with 0) the
        // platform default page size applies.
        let limit = match args.first().map(|arg| arg.parse::<u32>()) {
            None | Some(Ok(0)) => None,
            Some(Ok(limit)) => Some(limit.min(MAX_CLEAR)),
            Some(Err(e)) => {
                warn!(channel_id, "clear command failed because arg: {}", e);
                return ControlFlow::Continue(());
            }
        };

        let message_ids = match self.chat.message_ids(channel_id, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("failed to retrieve message ids: {}", e);
                say(self.chat.as_ref(), channel_id, &e.to_string()).await;
                return ControlFlow::Continue(());
            }
        };

        if let Err(e) = self.chat.bulk_delete(channel_id, &message_ids).await {
            warn!("failed to delete messages: {}", e);
            say(self.chat.as_ref(), channel_id, &e.to_string()).await;
        } else {
            info!(channel_id, "Cleared {} messages", message_ids.len());
        }

        ControlFlow::Continue(())
    }
}
