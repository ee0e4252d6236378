//! Mirror cards: the public, votable rendering of each catalog entry.

mod publisher;
mod render;

pub use publisher::{MirrorChannels, MirrorPublisher};
pub use render::*;

use thiserror::Error;

use crate::catalog::EntryId;
use crate::messenger::MessengerError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MirrorError {
    /// The entry being published is not (or no longer) held by the store.
    #[error("Entry {0} is not persisted in the store")]
    UnpersistedEntry(EntryId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}
