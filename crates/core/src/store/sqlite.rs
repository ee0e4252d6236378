//! SQLite-backed catalog and ledger.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::catalog::{token_key, CatalogEntry, CatalogStore, EntryFields, EntryId, MessageRef};
use crate::ledger::{RatingLedger, RatingRecord, Tally, VoteDirection};
use crate::messenger::{ChannelId, MessageId, UserId};

const ENTRY_COLUMNS: &str = "id, name, abbreviations, authors, store_link, image_url,
    android_supported, undetermined, mirror_channel_id, mirror_message_id, created_at";

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// SQLite-backed catalog and ledger.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                abbreviations TEXT NOT NULL,
                authors TEXT NOT NULL,
                store_link TEXT NOT NULL,
                image_url TEXT NOT NULL,
                android_supported INTEGER NOT NULL,
                undetermined INTEGER NOT NULL,
                mirror_channel_id INTEGER,
                mirror_message_id INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_entries_name_key ON catalog_entries(name_key);
            CREATE INDEX IF NOT EXISTS idx_catalog_entries_mirror
                ON catalog_entries(mirror_message_id);

            CREATE TABLE IF NOT EXISTS ratings (
                member_id INTEGER NOT NULL,
                entry_id INTEGER NOT NULL REFERENCES catalog_entries(id) ON DELETE CASCADE,
                direction TEXT NOT NULL CHECK (direction IN ('up', 'down')),
                PRIMARY KEY (member_id, entry_id)
            );

            CREATE INDEX IF NOT EXISTS idx_ratings_entry ON ratings(entry_id);
            "#,
        )
        .map_err(db_err)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        let abbreviations: String = row.get(2)?;
        let authors: String = row.get(3)?;
        let mirror_channel: Option<i64> = row.get(8)?;
        let mirror_message: Option<i64> = row.get(9)?;
        let created_at: String = row.get(10)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(CatalogEntry {
            id: EntryId(row.get::<_, i64>(0)? as u64),
            fields: EntryFields {
                name: row.get(1)?,
                abbreviations: parse_list(2, &abbreviations)?,
                authors: parse_list(3, &authors)?,
                store_link: row.get(4)?,
                image_url: row.get(5)?,
                android_supported: row.get(6)?,
                undetermined: row.get(7)?,
            },
            mirror: match (mirror_channel, mirror_message) {
                (Some(channel), Some(message)) => Some(MessageRef {
                    channel_id: ChannelId(channel as u64),
                    message_id: MessageId(message as u64),
                }),
                _ => None,
            },
            created_at,
        })
    }

    fn query_entry(
        conn: &Connection,
        condition: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM catalog_entries WHERE {} ORDER BY id LIMIT 1",
            ENTRY_COLUMNS, condition
        );
        conn.query_row(&sql, params![param], Self::row_to_entry)
            .optional()
            .map_err(db_err)
    }

    fn load(conn: &Connection, id: EntryId) -> Result<CatalogEntry, StoreError> {
        Self::query_entry(conn, "id = ?1", &(id.0 as i64))?
            .ok_or_else(|| StoreError::NotFound(format!("entry {}", id)))
    }
}

fn parse_list(column: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn encode_list(list: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(list).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl CatalogStore for SqliteStore {
    fn insert(&self, fields: EntryFields) -> Result<CatalogEntry, StoreError> {
        let fields = fields.normalized();
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO catalog_entries (name, name_key, abbreviations, authors, store_link,
                image_url, android_supported, undetermined, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &fields.name,
                fields.name_key(),
                encode_list(&fields.abbreviations)?,
                encode_list(&fields.authors)?,
                &fields.store_link,
                &fields.image_url,
                fields.android_supported,
                fields.undetermined,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Self::load(&conn, EntryId(conn.last_insert_rowid() as u64))
    }

    fn get(&self, id: EntryId) -> Result<CatalogEntry, StoreError> {
        let conn = self.conn()?;
        Self::load(&conn, id)
    }

    fn find_by_token(&self, token: &str) -> Result<CatalogEntry, StoreError> {
        let not_found = || StoreError::NotFound(format!("token '{}'", token.trim()));
        let key = token_key(token).ok_or_else(not_found)?;
        let conn = self.conn()?;

        if let Some(entry) = Self::query_entry(&conn, "name_key = ?1", &key)? {
            return Ok(entry);
        }

        Self::query_entry(
            &conn,
            "EXISTS (SELECT 1 FROM json_each(catalog_entries.abbreviations) \
             WHERE json_each.value = ?1)",
            &key,
        )?
        .ok_or_else(not_found)
    }

    fn find_by_mirror_message(&self, message: MessageId) -> Result<CatalogEntry, StoreError> {
        let conn = self.conn()?;
        Self::query_entry(&conn, "mirror_message_id = ?1", &(message.0 as i64))?
            .ok_or_else(|| StoreError::NotFound(format!("mirror message {}", message)))
    }

    fn update(&self, id: EntryId, fields: EntryFields) -> Result<CatalogEntry, StoreError> {
        let fields = fields.normalized();
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE catalog_entries SET name = ?, name_key = ?, abbreviations = ?, authors = ?,
                    store_link = ?, image_url = ?, android_supported = ?, undetermined = ?
                 WHERE id = ?",
                params![
                    &fields.name,
                    fields.name_key(),
                    encode_list(&fields.abbreviations)?,
                    encode_list(&fields.authors)?,
                    &fields.store_link,
                    &fields.image_url,
                    fields.android_supported,
                    fields.undetermined,
                    id.0 as i64,
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("entry {}", id)));
        }
        Self::load(&conn, id)
    }

    fn set_mirror(
        &self,
        id: EntryId,
        mirror: Option<MessageRef>,
    ) -> Result<CatalogEntry, StoreError> {
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE catalog_entries SET mirror_channel_id = ?, mirror_message_id = ? \
                 WHERE id = ?",
                params![
                    mirror.map(|m| m.channel_id.0 as i64),
                    mirror.map(|m| m.message_id.0 as i64),
                    id.0 as i64,
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("entry {}", id)));
        }
        Self::load(&conn, id)
    }

    fn delete(&self, id: EntryId) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute("DELETE FROM ratings WHERE entry_id = ?", params![id.0 as i64])
            .map_err(db_err)?;
        let removed = tx
            .execute("DELETE FROM catalog_entries WHERE id = ?", params![id.0 as i64])
            .map_err(db_err)?;

        if removed == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound(format!("entry {}", id)));
        }
        tx.commit().map_err(db_err)
    }

    fn list(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM catalog_entries ORDER BY id", ENTRY_COLUMNS);
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt.query_map([], Self::row_to_entry).map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM catalog_entries", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

impl RatingLedger for SqliteStore {
    fn upsert(
        &self,
        member: UserId,
        entry: EntryId,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;

        let exists = conn
            .query_row(
                "SELECT 1 FROM catalog_entries WHERE id = ?",
                params![entry.0 as i64],
                |_| Ok(()),
            )
            .optional()
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(format!("entry {}", entry)));
        }

        conn.execute(
            "INSERT INTO ratings (member_id, entry_id, direction) VALUES (?, ?, ?)
             ON CONFLICT(member_id, entry_id) DO UPDATE SET direction = excluded.direction",
            params![member.0 as i64, entry.0 as i64, direction.as_str()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn remove(&self, member: UserId, entry: EntryId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM ratings WHERE member_id = ? AND entry_id = ?",
                params![member.0 as i64, entry.0 as i64],
            )
            .map_err(db_err)?;
        Ok(removed > 0)
    }

    fn tally(&self, entry: EntryId) -> Result<Tally, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT direction, COUNT(*) FROM ratings WHERE entry_id = ? GROUP BY direction",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![entry.0 as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(db_err)?;

        let mut tally = Tally::default();
        for row in rows {
            let (direction, count) = row.map_err(db_err)?;
            match VoteDirection::parse(&direction) {
                Some(VoteDirection::Up) => tally.up = count as u64,
                Some(VoteDirection::Down) => tally.down = count as u64,
                None => {}
            }
        }
        Ok(tally)
    }

    fn list_by_member(&self, member: UserId) -> Result<Vec<RatingRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT entry_id, direction FROM ratings WHERE member_id = ? ORDER BY entry_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![member.0 as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (entry_id, direction) = row.map_err(db_err)?;
            let direction = VoteDirection::parse(&direction).ok_or_else(|| {
                StoreError::Serialization(format!("unknown vote direction '{}'", direction))
            })?;
            records.push(RatingRecord {
                member_id: member,
                entry_id: EntryId(entry_id as u64),
                direction,
            });
        }
        Ok(records)
    }

    fn prune_missing_members(&self, membership: &HashSet<UserId>) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let voters: Vec<i64> = {
            let mut stmt = tx
                .prepare("SELECT DISTINCT member_id FROM ratings")
                .map_err(db_err)?;
            let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
            let mut voters = Vec::new();
            for row in rows {
                voters.push(row.map_err(db_err)?);
            }
            voters
        };

        let mut removed = 0;
        for voter in voters {
            if !membership.contains(&UserId(voter as u64)) {
                removed += tx
                    .execute("DELETE FROM ratings WHERE member_id = ?", params![voter])
                    .map_err(db_err)?;
            }
        }

        tx.commit().map_err(db_err)?;
        Ok(removed)
    }

    fn rating_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }
}
