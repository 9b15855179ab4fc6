//! Dobby - Main entry point.

use anyhow::Context;
use clap::Parser;
use credential_store::{CredentialStore, Credentials};
use discord_client::{DiscordClient, MessageReceiver};
use dobby::chat::ChatSink;
use dobby::commands::default_registry;
use dobby::config::{Cli, Config};
use dobby::error::AppResult;
use dobby::pairing::{PairingConfig, PinPairing};
use dobby::Bot;
use plex_client::PlexClient;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(if cli.verbose { "debug" } else { &config.bot.log_level });

    info!("Starting Dobby...");

    if config.bot.keyword.is_empty() {
        return Err(anyhow::anyhow!("a keyword (or trigger) is required for dobby to work").into());
    }

    // Flags take priority over the secrets file
    let store = Arc::new(CredentialStore::new(&cli.secrets));
    let credentials = store
        .load()
        .await?
        .with_discord_token(cli.discord_token.as_deref());
    credentials.require_discord_token()?;

    // Initialize clients
    let plex = PlexClient::new(
        &config.plex.tv_url,
        config.client_identifier(),
        env!("CARGO_PKG_VERSION"),
        config.plex.timeout,
    )?;

    let discord = DiscordClient::new(&config.discord.api_url, &credentials.discord_token)?;

    let me = discord
        .current_user()
        .await
        .context("Failed to connect to Discord")?;
    info!("Connected to Discord as {} ({})", me.username, me.id);

    let chat: Arc<dyn ChatSink> = Arc::new(discord.clone());
    let pairing = Arc::new(PinPairing::new(
        Arc::new(plex.clone()),
        Arc::clone(&chat),
        Arc::clone(&store),
        PairingConfig::from(&config.pairing),
    ));

    if restore_plex_authorization(&plex, &credentials).await {
        pairing.mark_authorized().await;
        info!("Plex auth token is valid");
    } else {
        info!("we are not authorized. prompt to authorize plex PIN");
    }

    // Create command handlers
    let registry = Arc::new(default_registry(Arc::clone(&chat), Arc::clone(&pairing)));
    info!("Registered commands: {}", registry.names().join(", "));

    let bot = Arc::new(Bot::new(
        config.bot.keyword.clone(),
        me.id,
        registry,
        chat,
    ));

    if config.discord.channels.is_empty() {
        warn!("No channels configured (DISCORD__CHANNELS); nothing to listen to");
    }

    // Start message receiver
    let receiver = MessageReceiver::new(
        discord,
        config.discord.channels.clone(),
        config.discord.poll_interval,
    );
    let mut stream = Box::pin(receiver.stream());

    info!("bot is listening...");

    // Main message loop
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(message) = stream.next() => {
                let bot = Arc::clone(&bot);
                tokio::spawn(async move {
                    bot.handle(&message).await;
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    pairing.shutdown();
    info!("Shutting down...");
    Ok(())
}

/// Check a stored Plex token by picking a server and testing against it.
async fn restore_plex_authorization(plex: &PlexClient, credentials: &Credentials) -> bool {
    if !credentials.has_plex_token() {
        return false;
    }

    plex.set_token(credentials.plex.token.as_str()).await;

    if credentials.plex.host.is_empty() {
        let servers = match plex.servers().await {
            Ok(servers) => servers,
            Err(e) => {
                error!("failed testing auth token: {}", e);
                return false;
            }
        };

        match servers.iter().find_map(|s| s.preferred_uri()) {
            Some(uri) => plex.set_host(uri).await,
            None => return false,
        }
    } else {
        plex.set_host(credentials.plex.host.as_str()).await;
    }

    debug!("Testing Plex auth token against {}", plex.host().await);

    match plex.test().await {
        Ok(is_ok) => is_ok,
        Err(e) => {
            warn!("auth test failed: {}", e);
            false
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
