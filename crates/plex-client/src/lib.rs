//! Plex client for plex.tv PIN pairing and Media Server access.

mod client;
mod error;
mod types;

pub use client::PlexClient;
pub use error::PlexError;
pub use types::*;
