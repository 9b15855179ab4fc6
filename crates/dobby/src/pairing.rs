//! Plex PIN pairing.
//!
//! A pairing attempt requests a PIN from plex.tv, shows it in chat and then
//! polls plex.tv in a background task until the user links the PIN at
//! <https://plex.tv/link>, the check fails, the optional expiry elapses, or
//! the bot shuts down. At most one attempt runs at a time.
//!
//! On success the in-memory state is marked authorized before the token is
//! written to the credential file. If that write fails the bot stays
//! authorized for this run but the token is lost on restart.

use crate::chat::{say, ChatSink};
use async_trait::async_trait;
use credential_store::CredentialStore;
use plex_client::{PlexClient, PlexError, PlexPin};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

/// The plex.tv calls pairing depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PinService: Send + Sync {
    /// Ask plex.tv for a new PIN.
    async fn request_pin(&self) -> Result<PlexPin, PlexError>;

    /// Token once the PIN is linked, [`PlexError::PinNotAuthorized`] before.
    async fn check_pin(&self, pin: &PlexPin) -> Result<String, PlexError>;

    /// Start using a freshly obtained token.
    async fn set_token(&self, token: &str);
}

#[async_trait]
impl PinService for PlexClient {
    async fn request_pin(&self) -> Result<PlexPin, PlexError> {
        PlexClient::request_pin(self).await
    }

    async fn check_pin(&self, pin: &PlexPin) -> Result<String, PlexError> {
        PlexClient::check_pin(self, pin).await
    }

    async fn set_token(&self, token: &str) {
        PlexClient::set_token(self, token).await;
    }
}

/// Where the current (or last) attempt stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PairingPhase {
    #[default]
    Idle,
    PinRequested,
    Polling,
    Authorized,
    Failed,
}

/// Shared pairing flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingState {
    /// Set once a PIN check returned a token. Never cleared.
    pub authorized: bool,
    /// Set while an attempt is between requesting a PIN and its outcome.
    pub in_flight: bool,
    pub phase: PairingPhase,
}

/// How a polling task ended. Delivered exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    Authorized(String),
    Failed(String),
    Expired,
    Cancelled,
}

/// Result of [`PinPairing::start`].
#[derive(Debug)]
pub enum PairingStart {
    /// Already paired; nothing was requested.
    AlreadyAuthorized,
    /// Another attempt is polling; nothing was requested.
    InFlight,
    /// [`PinPairing::shutdown`] was called; nothing was requested.
    ShuttingDown,
    /// A PIN was shown and polling continues in the background.
    Started(PairingHandle),
}

/// Handle to a running attempt.
#[derive(Debug)]
pub struct PairingHandle {
    outcome: oneshot::Receiver<PairingOutcome>,
}

impl PairingHandle {
    /// Wait for the attempt to finish.
    pub async fn outcome(self) -> PairingOutcome {
        self.outcome.await.unwrap_or(PairingOutcome::Cancelled)
    }
}

/// Timing knobs for pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingConfig {
    /// Delay between PIN checks.
    pub poll_interval: Duration,
    /// Give up after this long. `None` polls until linked or failed.
    pub pin_expiry: Option<Duration>,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            pin_expiry: None,
        }
    }
}

pub const LINKED_MESSAGE: &str = "Successfully linked Dobby! :D";
pub const SAVE_FAILED_MESSAGE: &str =
    "`internal error - could not save plex authorization token`";
pub const EXPIRED_MESSAGE: &str = "the Plex PIN expired, run `dobby invite` again";
const INVALID_PIN_ERROR: &str = "internal error: invalid or no plex pin was passed";

/// Chat text announcing a new PIN.
pub fn pin_message(code: &str) -> String {
    format!(
        "Dobby is not authorized to access your Plex Media Server\n\
         Plex PIN: `{code}`\n\
         Please go to https://plex.tv/link and link your account using the code above"
    )
}

/// Chat text reporting a failed attempt.
pub fn failure_message(error: &str) -> String {
    format!("we have encountered an error :frowning2: :\n{error}")
}

/// Owns the pairing state and starts pairing attempts.
pub struct PinPairing {
    pins: Arc<dyn PinService>,
    chat: Arc<dyn ChatSink>,
    credentials: Arc<CredentialStore>,
    state: Arc<Mutex<PairingState>>,
    config: PairingConfig,
    cancel_tx: watch::Sender<bool>,
}

impl PinPairing {
    /// Create a new pairing state machine.
    pub fn new(
        pins: Arc<dyn PinService>,
        chat: Arc<dyn ChatSink>,
        credentials: Arc<CredentialStore>,
        config: PairingConfig,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            pins,
            chat,
            credentials,
            state: Arc::new(Mutex::new(PairingState::default())),
            config,
            cancel_tx,
        }
    }

    /// Snapshot of the current flags.
    pub async fn state(&self) -> PairingState {
        *self.state.lock().await
    }

    pub async fn is_authorized(&self) -> bool {
        self.state.lock().await.authorized
    }

    pub async fn phase(&self) -> PairingPhase {
        self.state.lock().await.phase
    }

    /// Record that a stored token was verified at startup.
    pub async fn mark_authorized(&self) {
        let mut state = self.state.lock().await;
        state.authorized = true;
        state.phase = PairingPhase::Authorized;
    }

    /// Stop every polling task. They finish with [`PairingOutcome::Cancelled`].
    pub fn shutdown(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Start a pairing attempt that reports to `channel_id`.
    ///
    /// Returns once the PIN has been shown; polling continues in a spawned
    /// task. A failed PIN request is returned to the caller and leaves no
    /// attempt in flight.
    #[instrument(skip(self))]
    pub async fn start(&self, channel_id: &str) -> Result<PairingStart, PlexError> {
        {
            let mut state = self.state.lock().await;
            if state.authorized {
                debug!("Dobby is already authorized");
                return Ok(PairingStart::AlreadyAuthorized);
            }
            if state.in_flight {
                debug!("A pairing attempt is already in flight");
                return Ok(PairingStart::InFlight);
            }
            if *self.cancel_tx.borrow() {
                debug!("Pairing is shut down");
                return Ok(PairingStart::ShuttingDown);
            }
            state.in_flight = true;
            state.phase = PairingPhase::PinRequested;
        }

        let pin = match self.pins.request_pin().await {
            Ok(pin) => pin,
            Err(e) => {
                let mut state = self.state.lock().await;
                state.in_flight = false;
                state.phase = PairingPhase::Failed;
                warn!("Plex PIN request failed: {}", e);
                return Err(e);
            }
        };

        if !pin.code.is_empty() {
            say(self.chat.as_ref(), channel_id, &pin_message(&pin.code)).await;
        }

        self.state.lock().await.phase = PairingPhase::Polling;
        info!(pin_id = pin.id, "Polling plex.tv for PIN authorization");

        let task = PollTask {
            pin,
            channel_id: channel_id.to_string(),
            pins: Arc::clone(&self.pins),
            chat: Arc::clone(&self.chat),
            credentials: Arc::clone(&self.credentials),
            state: Arc::clone(&self.state),
            config: self.config,
            cancel_rx: self.cancel_tx.subscribe(),
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = task.run().await;
            let _ = tx.send(outcome);
        });

        Ok(PairingStart::Started(PairingHandle { outcome: rx }))
    }
}

/// Background polling for one PIN.
struct PollTask {
    pin: PlexPin,
    channel_id: String,
    pins: Arc<dyn PinService>,
    chat: Arc<dyn ChatSink>,
    credentials: Arc<CredentialStore>,
    state: Arc<Mutex<PairingState>>,
    config: PairingConfig,
    cancel_rx: watch::Receiver<bool>,
}

impl PollTask {
    async fn run(mut self) -> PairingOutcome {
        if self.pin.code.is_empty() {
            error!("Invalid or no Plex PIN was passed");
            return self.fail(INVALID_PIN_ERROR.to_string()).await;
        }

        let deadline = self.config.pin_expiry.map(|expiry| Instant::now() + expiry);
        let mut attempt: u64 = 0;

        loop {
            if *self.cancel_rx.borrow() {
                return self.cancel().await;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return self.expire().await;
            }

            attempt += 1;
            debug!(pin_id = self.pin.id, attempt, "Checking Plex PIN");

            match self.pins.check_pin(&self.pin).await {
                Ok(token) => return self.authorize(token).await,
                Err(e) if e.is_pin_not_authorized() => {
                    debug!("Not authorized yet, sleeping for {:?}", self.config.poll_interval);
                }
                Err(e) => return self.fail(e.to_string()).await,
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                changed = self.cancel_rx.changed() => {
                    if changed.is_err() {
                        return self.cancel().await;
                    }
                }
            }
        }
    }

    async fn authorize(self, token: String) -> PairingOutcome {
        {
            let mut state = self.state.lock().await;
            state.authorized = true;
            state.phase = PairingPhase::Authorized;
        }
        info!("Plex PIN linked");

        self.pins.set_token(&token).await;
        say(self.chat.as_ref(), &self.channel_id, LINKED_MESSAGE).await;

        let saved = self
            .credentials
            .update(|credentials| credentials.plex.token = token.clone())
            .await;

        match saved {
            Ok(_) => debug!("Saved Plex auth token to {}", self.credentials.path().display()),
            Err(e) => {
                error!("Failed to save Plex auth token: {}", e);
                say(self.chat.as_ref(), &self.channel_id, SAVE_FAILED_MESSAGE).await;
            }
        }

        self.state.lock().await.in_flight = false;
        PairingOutcome::Authorized(token)
    }

    async fn fail(self, error: String) -> PairingOutcome {
        warn!("Plex pairing failed: {}", error);
        self.finish(PairingPhase::Failed).await;
        say(self.chat.as_ref(), &self.channel_id, &failure_message(&error)).await;
        PairingOutcome::Failed(error)
    }

    async fn expire(self) -> PairingOutcome {
        warn!(pin_id = self.pin.id, "Plex PIN expired before it was linked");
        self.finish(PairingPhase::Failed).await;
        say(self.chat.as_ref(), &self.channel_id, EXPIRED_MESSAGE).await;
        PairingOutcome::Expired
    }

    async fn cancel(self) -> PairingOutcome {
        info!(pin_id = self.pin.id, "Plex pairing cancelled");
        self.finish(PairingPhase::Idle).await;
        PairingOutcome::Cancelled
    }

    async fn finish(&self, phase: PairingPhase) {
        let mut state = self.state.lock().await;
        state.in_flight = false;
        state.phase = phase;
    }
}
