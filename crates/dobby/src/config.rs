//! Command-line flags and environment configuration.

use crate::pairing::PairingConfig;
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "dobby", version, about = "Discord bot for your Plex Media Server")]
pub struct Cli {
    /// Token used for bot authentication (overrides the secrets file)
    #[arg(long = "discord-token", env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// Output more information
    #[arg(long)]
    pub verbose: bool,

    /// Path to the TOML secrets file
    #[arg(long, env = "DOBBY_SECRETS", default_value = "./secrets.toml")]
    pub secrets: PathBuf,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Discord configuration
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Plex configuration
    #[serde(default)]
    pub plex: PlexConfig,

    /// PIN pairing configuration
    #[serde(default)]
    pub pairing: PairingSettings,

    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Discord REST API endpoint
    #[serde(default = "default_discord_api")]
    pub api_url: String,

    /// Channel ids to watch, comma separated
    #[serde(default, deserialize_with = "comma_separated")]
    pub channels: Vec<String>,

    /// Poll interval for new messages
    #[serde(default = "default_message_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexConfig {
    /// plex.tv endpoint used for PINs and server discovery
    #[serde(default = "default_plex_tv_url")]
    pub tv_url: String,

    /// Request timeout
    #[serde(default = "default_plex_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairingSettings {
    /// Delay between PIN checks
    #[serde(default = "default_pin_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Stop polling after this long (unset: poll until linked or failed)
    #[serde(default, with = "humantime_serde")]
    pub pin_expiry: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Trigger keyword
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// Name reported to Plex as the client identifier prefix
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default implementations
impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_url: default_discord_api(),
            channels: Vec::new(),
            poll_interval: default_message_poll_interval(),
        }
    }
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            tv_url: default_plex_tv_url(),
            timeout: default_plex_timeout(),
        }
    }
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_pin_poll_interval(),
            pin_expiry: None,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            client_name: default_client_name(),
            log_level: default_log_level(),
        }
    }
}

impl From<&PairingSettings> for PairingConfig {
    fn from(settings: &PairingSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            pin_expiry: settings.pin_expiry,
        }
    }
}

// Default value functions
fn default_discord_api() -> String {
    discord_client::DEFAULT_API_URL.into()
}

fn default_message_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_plex_tv_url() -> String {
    "https://plex.tv".into()
}

fn default_plex_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pin_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_keyword() -> String {
    "dobby".into()
}

fn default_client_name() -> String {
    "Dobby (discord bot)".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                environment
                    .separator("__")
                    // Keep snowflake ids as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Plex client identifier for this build.
    pub fn client_identifier(&self) -> String {
        format!("{}{}", self.bot.client_name, env!("CARGO_PKG_VERSION"))
    }
}
