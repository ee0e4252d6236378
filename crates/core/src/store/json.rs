//! JSON document store.
//!
//! The whole catalog and ledger live in one human-readable document. Each
//! mutation is applied to a copy which is written to disk before it replaces
//! the in-memory state, so a failed write changes nothing.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StoreError;
use crate::catalog::{
    select_by_token, token_key, CatalogEntry, CatalogStore, EntryFields, EntryId, MessageRef,
};
use crate::ledger::{RatingLedger, RatingRecord, Tally, VoteDirection};
use crate::messenger::{MessageId, UserId};

fn first_entry_id() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document {
    #[serde(default = "first_entry_id")]
    next_entry_id: u64,
    #[serde(default)]
    catalog_entries: Vec<CatalogEntry>,
    #[serde(default)]
    ratings: Vec<RatingRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            next_entry_id: first_entry_id(),
            catalog_entries: Vec::new(),
            ratings: Vec::new(),
        }
    }
}

impl Document {
    fn position(&self, id: EntryId) -> Result<usize, StoreError> {
        self.catalog_entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("entry {}", id)))
    }

    fn entry(&self, id: EntryId) -> Result<&CatalogEntry, StoreError> {
        self.position(id).map(|i| &self.catalog_entries[i])
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut CatalogEntry, StoreError> {
        let index = self.position(id)?;
        Ok(&mut self.catalog_entries[index])
    }
}

/// JSON-file-backed catalog and ledger.
pub struct JsonStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl JsonStore {
    /// Open the document at `path`, starting empty if the file does not exist yet.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let mut doc = if path.exists() {
            let raw = fs::read_to_string(path).map_err(|e| StoreError::Io(e.to_string()))?;
            if raw.trim().is_empty() {
                Document::default()
            } else {
                serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?
            }
        } else {
            Document::default()
        };

        // Keep the counter ahead of every id on disk, even if the file was edited by hand.
        let max_id = doc.catalog_entries.iter().map(|e| e.id.0).max().unwrap_or(0);
        doc.next_entry_id = doc.next_entry_id.max(max_id + 1);
        doc.catalog_entries.sort_by_key(|e| e.id);

        debug!(
            path = %path.display(),
            entries = doc.catalog_entries.len(),
            ratings = doc.ratings.len(),
            "Loaded JSON store"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            doc: Mutex::new(doc),
        })
    }

    /// Create a store that never touches disk (useful for testing).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(Document::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, StoreError> {
        self.doc
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Document) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let doc = self.lock()?;
        f(&doc)
    }

    /// Apply a mutation to a copy, persist it, then swap it in.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut doc = self.lock()?;
        let mut next = doc.clone();
        let result = f(&mut next)?;
        self.persist(&next)?;
        *doc = next;
        Ok(result)
    }

    fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl CatalogStore for JsonStore {
    fn insert(&self, fields: EntryFields) -> Result<CatalogEntry, StoreError> {
        self.mutate(|doc| {
            let entry = CatalogEntry {
                id: EntryId(doc.next_entry_id),
                fields: fields.normalized(),
                mirror: None,
                created_at: Utc::now(),
            };
            doc.next_entry_id += 1;
            doc.catalog_entries.push(entry.clone());
            Ok(entry)
        })
    }

    fn get(&self, id: EntryId) -> Result<CatalogEntry, StoreError> {
        self.read(|doc| doc.entry(id).cloned())
    }

    fn find_by_token(&self, token: &str) -> Result<CatalogEntry, StoreError> {
        let not_found = || StoreError::NotFound(format!("token '{}'", token.trim()));
        let key = token_key(token).ok_or_else(not_found)?;
        self.read(|doc| {
            select_by_token(&doc.catalog_entries, &key)
                .cloned()
                .ok_or_else(not_found)
        })
    }

    fn find_by_mirror_message(&self, message: MessageId) -> Result<CatalogEntry, StoreError> {
        self.read(|doc| {
            doc.catalog_entries
                .iter()
                .find(|e| e.mirror.is_some_and(|m| m.message_id == message))
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("mirror message {}", message)))
        })
    }

    fn update(&self, id: EntryId, fields: EntryFields) -> Result<CatalogEntry, StoreError> {
        self.mutate(|doc| {
            let entry = doc.entry_mut(id)?;
            entry.fields = fields.normalized();
            Ok(entry.clone())
        })
    }

    fn set_mirror(
        &self,
        id: EntryId,
        mirror: Option<MessageRef>,
    ) -> Result<CatalogEntry, StoreError> {
        self.mutate(|doc| {
            let entry = doc.entry_mut(id)?;
            entry.mirror = mirror;
            Ok(entry.clone())
        })
    }

    fn delete(&self, id: EntryId) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let index = doc.position(id)?;
            doc.catalog_entries.remove(index);
            doc.ratings.retain(|r| r.entry_id != id);
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        self.read(|doc| Ok(doc.catalog_entries.clone()))
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        self.read(|doc| Ok(doc.catalog_entries.len()))
    }
}

impl RatingLedger for JsonStore {
    fn upsert(
        &self,
        member: UserId,
        entry: EntryId,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        self.mutate(|doc| {
            doc.entry(entry)?;
            match doc
                .ratings
                .iter_mut()
                .find(|r| r.member_id == member && r.entry_id == entry)
            {
                Some(record) => record.direction = direction,
                None => doc.ratings.push(RatingRecord {
                    member_id: member,
                    entry_id: entry,
                    direction,
                }),
            }
            Ok(())
        })
    }

    fn remove(&self, member: UserId, entry: EntryId) -> Result<bool, StoreError> {
        let exists = self.read(|doc| {
            Ok(doc
                .ratings
                .iter()
                .any(|r| r.member_id == member && r.entry_id == entry))
        })?;
        if !exists {
            return Ok(false);
        }

        self.mutate(|doc| {
            let before = doc.ratings.len();
            doc.ratings
                .retain(|r| !(r.member_id == member && r.entry_id == entry));
            Ok(doc.ratings.len() < before)
        })
    }

    fn tally(&self, entry: EntryId) -> Result<Tally, StoreError> {
        self.read(|doc| {
            Ok(Tally::from_records(
                doc.ratings.iter().filter(|r| r.entry_id == entry),
            ))
        })
    }

    fn list_by_member(&self, member: UserId) -> Result<Vec<RatingRecord>, StoreError> {
        self.read(|doc| {
            let mut records: Vec<RatingRecord> = doc
                .ratings
                .iter()
                .filter(|r| r.member_id == member)
                .copied()
                .collect();
            records.sort_by_key(|r| r.entry_id);
            Ok(records)
        })
    }

    fn prune_missing_members(&self, membership: &HashSet<UserId>) -> Result<usize, StoreError> {
        self.mutate(|doc| {
            let before = doc.ratings.len();
            doc.ratings.retain(|r| membership.contains(&r.member_id));
            Ok(before - doc.ratings.len())
        })
    }

    fn rating_count(&self) -> Result<usize, StoreError> {
        self.read(|doc| Ok(doc.ratings.len()))
    }
}
