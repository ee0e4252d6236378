use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messenger::{ChannelId, MessageId};

/// Store-assigned entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a posted mirror card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// The user-editable part of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
    pub name: String,
    /// Lowercase, unique, in the order they were given.
    #[serde(default)]
    pub abbreviations: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub store_link: String,
    pub image_url: String,
    #[serde(default)]
    pub android_supported: bool,
    /// Selects which public channel mirrors the entry.
    #[serde(default)]
    pub undetermined: bool,
}

impl EntryFields {
    /// Canonical form the stores persist.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.store_link = self.store_link.trim().to_string();
        self.image_url = self.image_url.trim().to_string();

        let mut abbreviations: Vec<String> = Vec::with_capacity(self.abbreviations.len());
        for abbr in &self.abbreviations {
            let abbr = abbr.trim().to_lowercase();
            if !abbr.is_empty() && !abbreviations.contains(&abbr) {
                abbreviations.push(abbr);
            }
        }
        self.abbreviations = abbreviations;

        self.authors = self
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Lowercased name used for lookups.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn has_abbreviation(&self, token_key: &str) -> bool {
        self.abbreviations.iter().any(|a| a == token_key)
    }
}

/// A persisted catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub fields: EntryFields,
    /// Where the entry is currently mirrored; absent until first published.
    #[serde(default)]
    pub mirror: Option<MessageRef>,
    pub created_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

/// Normalize a lookup token. Returns `None` for a blank token.
pub fn token_key(token: &str) -> Option<String> {
    let key = token.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

/// Resolve a token against entries given in ascending id order.
pub fn select_by_token<'a, I>(entries: I, token_key: &str) -> Option<&'a CatalogEntry>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
    I::IntoIter: Clone,
{
    let entries = entries.into_iter();
    entries
        .clone()
        .find(|e| e.fields.name_key() == token_key)
        .or_else(|| entries.into_iter().find(|e| e.fields.has_abbreviation(token_key)))
}
