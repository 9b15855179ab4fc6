//! Plex HTTP client.

use crate::error::PlexError;
use crate::types::*;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Product name sent in `X-Plex-Product`.
const PRODUCT: &str = "Dobby";

/// Mutable connection settings shared by every clone of a [`PlexClient`].
struct PlexSettings {
    host: String,
    token: Option<SecretString>,
    timeout: Duration,
    client_identifier: String,
}

/// Plex client for plex.tv PIN pairing and Media Server access.
///
/// Clones share their settings: a token set through one clone is used by
/// all of them. Settings only change through the `set_*` methods.
#[derive(Clone)]
pub struct PlexClient {
    client: Client,
    tv_url: String,
    version: String,
    settings: Arc<RwLock<PlexSettings>>,
}

impl PlexClient {
    /// Create a new Plex client.
    pub fn new(
        tv_url: impl Into<String>,
        client_identifier: impl Into<String>,
        version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlexError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            tv_url: tv_url.into(),
            version: version.into(),
            settings: Arc::new(RwLock::new(PlexSettings {
                host: String::new(),
                token: None,
                timeout,
                client_identifier: client_identifier.into(),
            })),
        })
    }

    /// Set the auth token used for authenticated requests.
    pub async fn set_token(&self, token: impl Into<String>) {
        self.settings.write().await.token = Some(SecretString::new(token.into()));
    }

    /// Set the Plex Media Server URL.
    pub async fn set_host(&self, host: impl Into<String>) {
        self.settings.write().await.host = host.into();
    }

    /// Set the per-request timeout.
    pub async fn set_timeout(&self, timeout: Duration) {
        self.settings.write().await.timeout = timeout;
    }

    /// Set the identifier sent as `X-Plex-Client-Identifier`.
    pub async fn set_client_identifier(&self, client_identifier: impl Into<String>) {
        self.settings.write().await.client_identifier = client_identifier.into();
    }

    /// Currently configured Media Server URL (empty if none).
    pub async fn host(&self) -> String {
        self.settings.read().await.host.clone()
    }

    /// Currently configured client identifier.
    pub async fn client_identifier(&self) -> String {
        self.settings.read().await.client_identifier.clone()
    }

    /// Whether an auth token is set.
    pub async fn has_token(&self) -> bool {
        self.settings.read().await.token.is_some()
    }

    /// Request a new pairing PIN from plex.tv.
    #[instrument(skip(self))]
    pub async fn request_pin(&self) -> Result<PlexPin, PlexError> {
        let response = self
            .request(Method::POST, format!("{}/api/v2/pins", self.tv_url))
            .await
            .send()
            .await?;

        let pin: PlexPin = self.handle_response(response).await?;
        debug!(pin_id = pin.id, "Received Plex PIN");
        Ok(pin)
    }

    /// Check whether a PIN has been linked.
    ///
    /// Returns the auth token once linked, or
    /// [`PlexError::PinNotAuthorized`] while the user has not linked it yet.
    #[instrument(skip(self, pin), fields(pin_id = pin.id))]
    pub async fn check_pin(&self, pin: &PlexPin) -> Result<String, PlexError> {
        let client_identifier = Some(pin.client_identifier.as_str()).filter(|id| !id.is_empty());
        let response = self
            .request_as(
                Method::GET,
                format!("{}/api/v2/pins/{}", self.tv_url, pin.id),
                client_identifier,
            )
            .await
            .send()
            .await?;
        let checked: PlexPin = self.handle_response(response).await?;

        checked
            .auth_token
            .filter(|token| !token.is_empty())
            .ok_or(PlexError::PinNotAuthorized)
    }

    /// List the Media Servers reachable with the current token.
    #[instrument(skip(self))]
    pub async fn servers(&self) -> Result<Vec<PlexResource>, PlexError> {
        let response = self
            .request(
                Method::GET,
                format!("{}/api/v2/resources?includeHttps=1", self.tv_url),
            )
            .await
            .send()
            .await?;

        let resources: Vec<PlexResource> = self.handle_response(response).await?;
        Ok(resources.into_iter().filter(PlexResource::is_server).collect())
    }

    /// Test the current token against the configured Media Server.
    ///
    /// Returns `Ok(false)` when the server rejects the token.
    #[instrument(skip(self))]
    pub async fn test(&self) -> Result<bool, PlexError> {
        let host = self.host().await;
        if host.is_empty() {
            return Err(PlexError::NoHost);
        }

        let response = self
            .request(Method::GET, format!("{}/", host.trim_end_matches('/')))
            .await
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(self.extract_error(response).await),
        }
    }

    /// Build a request carrying the standard Plex headers.
    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.request_as(method, url, None).await
    }

    /// Like [`Self::request`], optionally overriding the client identifier.
    async fn request_as(
        &self,
        method: Method,
        url: String,
        client_identifier: Option<&str>,
    ) -> RequestBuilder {
        let settings = self.settings.read().await;
        let client_identifier = client_identifier.unwrap_or(settings.client_identifier.as_str());

        let mut builder = self
            .client
            .request(method, url)
            .timeout(settings.timeout)
            .header("Accept", "application/json")
            .header("X-Plex-Product", PRODUCT)
            .header("X-Plex-Version", &self.version)
            .header("X-Plex-Client-Identifier", client_identifier);

        if let Some(token) = &settings.token {
            builder = builder.header("X-Plex-Token", token.expose_secret());
        }

        builder
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PlexError> {
        if response.status().is_success() {
            let body = response.text().await?;
            debug!("Response body: {}", body.get(..200).unwrap_or(&body));
            serde_json::from_str(&body).map_err(PlexError::from)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract error information from failed response.
    async fn extract_error(&self, response: reqwest::Response) -> PlexError {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("Plex authentication failed");
            return PlexError::Unauthorized;
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        PlexError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
