//! Credential record persisted as a TOML file.
//!
//! Holds the Discord bot token and the Plex token obtained by PIN pairing.

mod error;
mod store;
mod types;

pub use error::CredentialError;
pub use store::CredentialStore;
pub use types::*;
