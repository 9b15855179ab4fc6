//! Bot command handlers.

mod clear;
mod invite;
mod registry;

pub use clear::ClearHandler;
pub use invite::{InviteHandler, PairingHandler};
pub use registry::CommandRegistry;

use crate::chat::ChatSink;
use crate::pairing::PinPairing;
use async_trait::async_trait;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Command handler trait.
///
/// Handlers report their own failures to chat; the returned flow decides
/// whether the next handler registered for the same command runs.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handler name, used in logs.
    fn name(&self) -> &str;

    /// Execute the command with the arguments that followed its name.
    async fn execute(&self, channel_id: &str, args: &[String]) -> ControlFlow<()>;
}

/// Registry with Dobby's commands: `clear` and `invite`.
pub fn default_registry(chat: Arc<dyn ChatSink>, pairing: Arc<PinPairing>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Optional argument caps how many recent messages are removed
    registry.register(
        "clear",
        vec![Arc::new(ClearHandler::new(Arc::clone(&chat))) as Arc<dyn CommandHandler>],
    );

    // Pairs with Plex first when needed
    registry.register(
        "invite",
        vec![
            Arc::new(PairingHandler::new(Arc::clone(&pairing), Arc::clone(&chat)))
                as Arc<dyn CommandHandler>,
            Arc::new(InviteHandler::new(pairing, chat)),
        ],
    );

    registry
}
