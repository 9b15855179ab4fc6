//! Plex client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The PIN exists but the user has not linked it yet.
    #[error("pin is not authorized yet")]
    PinNotAuthorized,

    #[error("Authentication failed")]
    Unauthorized,

    #[error("no Plex host configured")]
    NoHost,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl PlexError {
    /// Whether this is the retry signal returned while a PIN awaits linking.
    pub fn is_pin_not_authorized(&self) -> bool {
        matches!(self, PlexError::PinNotAuthorized)
    }
}
