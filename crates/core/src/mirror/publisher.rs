//! Keeps mirror cards in step with the store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::render::{render_announcement, render_card, CardAuthor, VoteReaction, RATINGS_FIELD};
use super::MirrorError;
use crate::catalog::{CatalogEntry, EntryId, MessageRef};
use crate::config::ChannelsConfig;
use crate::messenger::{ChannelId, MessageId, Messenger, OutgoingMessage, RoleId};
use crate::metrics;
use crate::store::Store;

/// The two public channels entries are mirrored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorChannels {
    pub listed: ChannelId,
    pub undetermined: ChannelId,
}

impl MirrorChannels {
    /// Channel an entry with the given classification belongs in.
    pub fn target(&self, undetermined: bool) -> ChannelId {
        if undetermined {
            self.undetermined
        } else {
            self.listed
        }
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        channel == self.listed || channel == self.undetermined
    }
}

impl From<&ChannelsConfig> for MirrorChannels {
    fn from(config: &ChannelsConfig) -> Self {
        Self {
            listed: config.listed,
            undetermined: config.undetermined,
        }
    }
}

fn record(kind: &str, status: &str) {
    metrics::MIRROR_OPERATIONS
        .with_label_values(&[kind, status])
        .inc();
}

/// Publishes, edits and removes mirror cards.
pub struct MirrorPublisher {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    channels: MirrorChannels,
    author: CardAuthor,
    /// Serializes tally refreshes per card so an older tally never lands last.
    refresh_locks: Mutex<HashMap<EntryId, Arc<Mutex<()>>>>,
}

impl MirrorPublisher {
    pub fn new(
        store: Arc<dyn Store>,
        messenger: Arc<dyn Messenger>,
        channels: MirrorChannels,
        author: CardAuthor,
    ) -> Self {
        Self {
            store,
            messenger,
            channels,
            author,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn refresh_lock(&self, entry: EntryId) -> Arc<Mutex<()>> {
        self.refresh_locks
            .lock()
            .await
            .entry(entry)
            .or_default()
            .clone()
    }

    pub fn channels(&self) -> &MirrorChannels {
        &self.channels
    }

    /// Post a fresh card for the entry and record it on the entry.
    ///
    /// Returns the entry as stored after the mirror reference was written.
    pub async fn publish(&self, entry: &CatalogEntry) -> Result<CatalogEntry, MirrorError> {
        let channel = self.channels.target(entry.fields.undetermined);
        let tally = self.store.tally(entry.id)?;
        let card = render_card(entry, tally, &self.author);

        let message = self
            .messenger
            .send_message(channel, OutgoingMessage::embed(card))
            .await
            .inspect_err(|_| record("publish", "error"))?;

        let mirror = MessageRef {
            channel_id: channel,
            message_id: message,
        };
        let published = match self.store.set_mirror(entry.id, Some(mirror)) {
            Ok(published) => published,
            Err(e) if e.is_not_found() => {
                error!(
                    entry_id = %entry.id,
                    message = %message,
                    "Published a card for an entry the store does not hold"
                );
                if let Err(e) = self.messenger.delete_message(channel, message).await {
                    warn!(message = %message, error = %e, "Failed to remove orphaned card");
                }
                record("publish", "error");
                return Err(MirrorError::UnpersistedEntry(entry.id));
            }
            Err(e) => return Err(e.into()),
        };

        for reaction in VoteReaction::ALL {
            self.messenger
                .add_reaction(channel, message, reaction.emoji())
                .await?;
        }

        record("publish", "success");
        info!(
            entry_id = %entry.id,
            channel = %channel,
            message = %message,
            "Published mirror card"
        );
        Ok(published)
    }

    /// Bring the card in line with the entry, republishing if it is gone or misplaced.
    pub async fn resync(&self, entry: &CatalogEntry) -> Result<CatalogEntry, MirrorError> {
        let Some(mirror) = entry.mirror else {
            return self.publish(entry).await;
        };

        let target = self.channels.target(entry.fields.undetermined);
        if mirror.channel_id == target {
            let tally = self.store.tally(entry.id)?;
            let card = render_card(entry, tally, &self.author);
            match self
                .messenger
                .edit_embed(mirror.channel_id, mirror.message_id, card)
                .await
            {
                Ok(()) => {
                    record("edit", "success");
                    debug!(
                        entry_id = %entry.id,
                        message = %mirror.message_id,
                        "Edited mirror card"
                    );
                    return Ok(entry.clone());
                }
                Err(e) if e.is_not_found() => {
                    info!(entry_id = %entry.id, "Mirror card is gone, republishing");
                }
                Err(e) => {
                    record("edit", "error");
                    return Err(e.into());
                }
            }
        } else {
            info!(
                entry_id = %entry.id,
                from = %mirror.channel_id,
                to = %target,
                "Entry moved channels, republishing"
            );
            self.retract(entry).await;
        }

        record("republish", "success");
        self.publish(entry).await
    }

    /// Rewrite only the tally on the posted card.
    ///
    /// Refreshes of the same entry run one at a time and read the entry and its
    /// tally while holding the entry's lock, so the last edit carries the latest tally.
    pub async fn refresh_tally(&self, entry: &CatalogEntry) -> Result<CatalogEntry, MirrorError> {
        let lock = self.refresh_lock(entry.id).await;
        let _guard = lock.lock().await;

        let entry = &self.store.get(entry.id)?;
        let Some(mirror) = entry.mirror else {
            return self.resync(entry).await;
        };

        let tally = self.store.tally(entry.id)?;
        let posted = match self
            .messenger
            .fetch_message(mirror.channel_id, mirror.message_id)
            .await
        {
            Ok(posted) => posted,
            Err(e) if e.is_not_found() => {
                warn!(entry_id = %entry.id, "Mirror card missing on vote, resyncing");
                return self.resync(entry).await;
            }
            Err(e) => return Err(e.into()),
        };

        let mut card = posted
            .embeds
            .into_iter()
            .next()
            .unwrap_or_else(|| render_card(entry, tally, &self.author));
        card.set_field(RATINGS_FIELD, tally.to_string(), true);

        match self
            .messenger
            .edit_embed(mirror.channel_id, mirror.message_id, card)
            .await
        {
            Ok(()) => {
                record("refresh", "success");
                debug!(entry_id = %entry.id, tally = %tally, "Refreshed tally");
                Ok(entry.clone())
            }
            Err(e) if e.is_not_found() => self.resync(entry).await,
            Err(e) => {
                record("refresh", "error");
                Err(e.into())
            }
        }
    }

    /// Remove the entry's card if it has one. Failures are logged and ignored.
    ///
    /// Returns whether a card was deleted.
    pub async fn retract(&self, entry: &CatalogEntry) -> bool {
        let Some(mirror) = entry.mirror else {
            return false;
        };

        match self
            .messenger
            .delete_message(mirror.channel_id, mirror.message_id)
            .await
        {
            Ok(()) => {
                record("retract", "success");
                true
            }
            Err(e) if e.is_not_found() => {
                debug!(entry_id = %entry.id, "Mirror card already gone");
                false
            }
            Err(e) => {
                record("retract", "error");
                warn!(entry_id = %entry.id, error = %e, "Failed to delete mirror card");
                false
            }
        }
    }

    /// Delete every message in both mirror channels.
    pub async fn clear_channels(&self) -> Result<usize, MirrorError> {
        let mut removed = 0;
        for channel in [self.channels.listed, self.channels.undetermined] {
            removed += self.messenger.clear_channel(channel).await?;
        }
        info!(removed = removed, "Cleared mirror channels");
        Ok(removed)
    }

    /// Post an update announcement for an entry and publish it to followers.
    pub async fn announce(
        &self,
        entry: &CatalogEntry,
        channel: ChannelId,
        title: &str,
        url: &str,
        mention: Option<RoleId>,
    ) -> Result<MessageId, MirrorError> {
        let tally = self.store.tally(entry.id)?;
        let card = render_announcement(entry, tally, title, url, &self.author);
        let mut message = OutgoingMessage::embed(card);
        if let Some(role) = mention {
            message = message.with_content(format!("<@&{}>", role));
        }

        let id = self.messenger.send_message(channel, message).await?;
        if let Err(e) = self.messenger.crosspost(channel, id).await {
            warn!(
                channel = %channel,
                message = %id,
                error = %e,
                "Failed to crosspost announcement"
            );
        }
        info!(entry_id = %entry.id, channel = %channel, "Posted announcement");
        Ok(id)
    }
}
