//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use curator_core::testing::{fixtures, MockMessenger};
//!
//! let messenger = MockMessenger::new();
//! let entry = store.insert(fixtures::bonk_quest())?;
//!
//! // Simulate a moderator deleting the card by hand
//! messenger.vanish(message_id).await;
//! ```

mod mock_messenger;

pub use mock_messenger::{MockMessage, MockMessenger, RemovedReaction};

use crate::messenger::IncomingMessage;
use crate::wizard::ReplyHub;

/// Offer a reply to the hub once a wizard session is waiting for it.
///
/// Yields to other tasks between attempts without advancing a paused clock.
/// Panics if no session picks the message up.
pub async fn deliver_reply(hub: &ReplyHub, message: &IncomingMessage) {
    for _ in 0..10_000 {
        if hub.deliver(message) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("no wizard session consumed {:?}", message.content);
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::catalog::{CatalogEntry, EntryFields, EntryId};
    use crate::messenger::{Attachment, ChannelId, IncomingMessage, UserId};

    /// Fields of a typical listed entry.
    pub fn bonk_quest() -> EntryFields {
        EntryFields {
            name: "Bonk Quest".to_string(),
            abbreviations: vec!["bq".to_string()],
            authors: vec!["A".to_string(), "B".to_string()],
            store_link: "http://x".to_string(),
            image_url: "http://img/bonk.png".to_string(),
            android_supported: false,
            undetermined: false,
        }
    }

    /// Minimal fields with the given name.
    pub fn named(name: &str) -> EntryFields {
        EntryFields {
            name: name.to_string(),
            store_link: format!("http://store/{}", name.to_lowercase().replace(' ', "-")),
            image_url: "http://img/preview.png".to_string(),
            ..Default::default()
        }
    }

    /// An entry that was never stored or published.
    pub fn catalog_entry(id: u64, fields: EntryFields) -> CatalogEntry {
        CatalogEntry {
            id: EntryId(id),
            fields,
            mirror: None,
            created_at: Utc::now(),
        }
    }

    /// A plain text chat message.
    pub fn message(channel: ChannelId, author: UserId, content: &str) -> IncomingMessage {
        IncomingMessage {
            channel_id: channel,
            author_id: author,
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }

    /// A chat message carrying one image.
    pub fn image_message(channel: ChannelId, author: UserId, url: &str) -> IncomingMessage {
        IncomingMessage {
            attachments: vec![Attachment {
                url: url.to_string(),
                filename: Some("preview.png".to_string()),
            }],
            ..message(channel, author, "")
        }
    }
}
