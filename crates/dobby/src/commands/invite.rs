//! Invite command - pairs with Plex if needed, then invites.

use crate::chat::{say, ChatSink};
use crate::commands::CommandHandler;
use crate::pairing::{PairingStart, PinPairing};
use async_trait::async_trait;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info};

/// Starts Plex PIN pairing when Dobby is not yet authorized.
///
/// Lets the chain continue when already paired (or when another attempt is
/// polling) and stops it while a new PIN is being shown.
pub struct PairingHandler {
    pairing: Arc<PinPairing>,
    chat: Arc<dyn ChatSink>,
}

impl PairingHandler {
    pub fn new(pairing: Arc<PinPairing>, chat: Arc<dyn ChatSink>) -> Self {
        Self { pairing, chat }
    }
}

#[async_trait]
impl CommandHandler for PairingHandler {
    fn name(&self) -> &str {
        "plex-pin"
    }

    async fn execute(&self, channel_id: &str, _args: &[String]) -> ControlFlow<()> {
        match self.pairing.start(channel_id).await {
            Ok(PairingStart::AlreadyAuthorized) => ControlFlow::Continue(()),
            Ok(PairingStart::InFlight) => {
                debug!("Plex pairing already in progress");
                ControlFlow::Continue(())
            }
            Ok(PairingStart::Started(_)) | Ok(PairingStart::ShuttingDown) => ControlFlow::Break(()),
            Err(e) => {
                say(
                    self.chat.as_ref(),
                    channel_id,
                    &format!("could not request a Plex PIN: {e}"),
                )
                .await;
                ControlFlow::Break(())
            }
        }
    }
}

/// Invites a user to the Plex Media Server once Dobby is authorized.
pub struct InviteHandler {
    pairing: Arc<PinPairing>,
    chat: Arc<dyn ChatSink>,
}

impl InviteHandler {
    pub fn new(pairing: Arc<PinPairing>, chat: Arc<dyn ChatSink>) -> Self {
        Self { pairing, chat }
    }
}

#[async_trait]
impl CommandHandler for InviteHandler {
    fn name(&self) -> &str {
        "invite"
    }

    async fn execute(&self, channel_id: &str, _args: &[String]) -> ControlFlow<()> {
        if !self.pairing.is_authorized().await {
            info!("invite() - dobby is not authorized");
            say(
                self.chat.as_ref(),
                channel_id,
                "dobby is not authorized to send invites!",
            )
            .await;
            return ControlFlow::Break(());
        }

        say(
            self.chat.as_ref(),
            channel_id,
            "inviting user to our Plex Media Server",
        )
        .await;
        ControlFlow::Continue(())
    }
}
