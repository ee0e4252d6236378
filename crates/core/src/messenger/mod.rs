//! Messaging boundary: the chat platform the catalog is mirrored into.

mod discord;
mod types;

pub use discord::DiscordMessenger;
pub use types::*;
