//! Common test utilities for integration tests.

use credential_store::CredentialStore;
use discord_client::{BotMessage, DiscordClient};
use dobby::chat::ChatSink;
use dobby::commands::default_registry;
use dobby::pairing::{PairingConfig, PinPairing};
use dobby::Bot;
use plex_client::PlexClient;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const BOT_ID: &str = "1000";
pub const CHANNEL_ID: &str = "2000";

/// Everything a test needs to drive the bot against mock servers.
pub struct Harness {
    pub bot: Bot,
    pub pairing: Arc<PinPairing>,
    pub discord: MockServer,
    pub plex: MockServer,
    pub store: Arc<CredentialStore>,
    pub _dir: tempfile::TempDir,
}

/// Wire a bot to mock Discord and Plex servers.
pub async fn harness() -> Harness {
    let discord = MockServer::start().await;
    let plex = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let discord_client = DiscordClient::new(discord.uri(), "test-token").unwrap();
    let plex_client = PlexClient::new(
        plex.uri(),
        "Dobby (discord bot)test",
        "test",
        Duration::from_secs(5),
    )
    .unwrap();
    let store = Arc::new(CredentialStore::new(dir.path().join("secrets.toml")));

    let chat: Arc<dyn ChatSink> = Arc::new(discord_client);
    let pairing = Arc::new(PinPairing::new(
        Arc::new(plex_client),
        Arc::clone(&chat),
        Arc::clone(&store),
        PairingConfig {
            poll_interval: Duration::from_millis(5),
            pin_expiry: Some(Duration::from_secs(5)),
        },
    ));
    let registry = Arc::new(default_registry(Arc::clone(&chat), Arc::clone(&pairing)));
    let bot = Bot::new("dobby", BOT_ID, registry, chat);

    Harness {
        bot,
        pairing,
        discord,
        plex,
        store,
        _dir: dir,
    }
}

/// A message posted by a human in the test channel.
pub fn user_message(text: &str) -> BotMessage {
    BotMessage {
        id: "3000".into(),
        channel_id: CHANNEL_ID.into(),
        author_id: "42".into(),
        author_name: "alice".into(),
        text: text.into(),
    }
}

/// Contents of every message the bot posted, in order.
pub async fn sent_texts(server: &MockServer) -> Vec<String> {
    let path = format!("/channels/{}/messages", CHANNEL_ID);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method == wiremock::http::Method::Post && r.url.path() == path)
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["content"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

/// Poll until `count` messages have been posted or a second passes.
pub async fn wait_for_sent(server: &MockServer, count: usize) -> Vec<String> {
    for _ in 0..200 {
        let texts = sent_texts(server).await;
        if texts.len() >= count {
            return texts;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    sent_texts(server).await
}
