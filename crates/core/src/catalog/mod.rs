//! Catalog of voted entries.
//!
//! Entries are the items members vote on. Each one is mirrored as a card in
//! one of two public channels; the store keeps the reference to that card so
//! reactions can be traced back to the entry.

mod types;

pub use types::*;

use crate::messenger::MessageId;
use crate::store::StoreError;

/// Trait for catalog entry storage.
///
/// Every operation is atomic for a single entry.
pub trait CatalogStore: Send + Sync {
    /// Persist a new entry. The store assigns the id; ids are never reused.
    fn insert(&self, fields: EntryFields) -> Result<CatalogEntry, StoreError>;

    /// Get an entry by id.
    fn get(&self, id: EntryId) -> Result<CatalogEntry, StoreError>;

    /// Find an entry by name or abbreviation, case-insensitively.
    ///
    /// A name match anywhere in the catalog wins over an abbreviation match.
    /// Within either kind, the earliest created entry wins.
    fn find_by_token(&self, token: &str) -> Result<CatalogEntry, StoreError>;

    /// Find the entry whose mirror card is the given message.
    fn find_by_mirror_message(&self, message: MessageId) -> Result<CatalogEntry, StoreError>;

    /// Replace the fields of an entry. The mirror reference is left untouched.
    fn update(&self, id: EntryId, fields: EntryFields) -> Result<CatalogEntry, StoreError>;

    /// Attach (or clear) the mirror reference of an entry.
    fn set_mirror(
        &self,
        id: EntryId,
        mirror: Option<MessageRef>,
    ) -> Result<CatalogEntry, StoreError>;

    /// Delete an entry together with every rating referencing it.
    fn delete(&self, id: EntryId) -> Result<(), StoreError>;

    /// All entries in ascending creation order.
    fn list(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    fn entry_count(&self) -> Result<usize, StoreError>;
}
