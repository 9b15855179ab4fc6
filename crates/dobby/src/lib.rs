//! Dobby - a Discord bot that pairs with Plex via PIN.

pub mod bot;
pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod pairing;
pub mod router;

pub use bot::Bot;
pub use error::{AppError, AppResult};
