//! Mock messenger for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::messenger::{
    ChannelId, Embed, MessageId, Messenger, MessengerError, OutgoingMessage, PostedMessage, UserId,
};

/// A message the mock currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub content: Option<String>,
    pub embed: Option<Embed>,
    /// Reactions added by the bot, in order.
    pub reactions: Vec<String>,
    pub crossposted: bool,
}

/// A recorded reaction removal for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedReaction {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: String,
    pub user_id: UserId,
}

#[derive(Debug, Default)]
struct MockState {
    messages: BTreeMap<MessageId, MockMessage>,
    /// Every message ever sent, including ones deleted since.
    sent: Vec<MockMessage>,
    edits: Vec<(MessageId, Embed)>,
    deleted: Vec<MessageId>,
    removed_reactions: Vec<RemovedReaction>,
    next_id: u64,
}

/// Mock implementation of the Messenger trait.
///
/// Provides controllable behavior for testing:
/// - Track sent, edited and deleted messages for assertions
/// - Simulate messages deleted outside the bot
/// - Simulate failures
#[derive(Debug, Clone)]
pub struct MockMessenger {
    state: Arc<RwLock<MockState>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<MessengerError>>>,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState {
                next_id: 1000,
                ..Default::default()
            })),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: MessengerError) {
        *self.next_error.write().await = Some(error);
    }

    async fn check_error(&self) -> Result<(), MessengerError> {
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Remove a message as if someone deleted it by hand.
    pub async fn vanish(&self, message: MessageId) {
        self.state.write().await.messages.remove(&message);
    }

    /// A message that still exists.
    pub async fn message(&self, message: MessageId) -> Option<MockMessage> {
        self.state.read().await.messages.get(&message).cloned()
    }

    /// Messages currently present in a channel, oldest first.
    pub async fn messages_in(&self, channel: ChannelId) -> Vec<MockMessage> {
        self.state
            .read()
            .await
            .messages
            .values()
            .filter(|m| m.channel_id == channel)
            .cloned()
            .collect()
    }

    /// Text content of every message sent to a channel, oldest first.
    pub async fn texts_sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|m| m.channel_id == channel)
            .filter_map(|m| m.content.clone())
            .collect()
    }

    /// The most recent text sent to a channel.
    pub async fn last_text(&self, channel: ChannelId) -> Option<String> {
        self.texts_sent_to(channel).await.pop()
    }

    pub async fn edits(&self) -> Vec<(MessageId, Embed)> {
        self.state.read().await.edits.clone()
    }

    pub async fn deleted(&self) -> Vec<MessageId> {
        self.state.read().await.deleted.clone()
    }

    pub async fn removed_reactions(&self) -> Vec<RemovedReaction> {
        self.state.read().await.removed_reactions.clone()
    }

    /// Number of cards (messages with an embed) ever sent.
    pub async fn cards_sent(&self) -> usize {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|m| m.embed.is_some())
            .count()
    }

    /// Clear recorded calls, keeping the current messages.
    pub async fn clear_recorded(&self) {
        let mut state = self.state.write().await;
        state.sent.clear();
        state.edits.clear();
        state.deleted.clear();
        state.removed_reactions.clear();
    }

    fn not_found(channel: ChannelId, message: MessageId) -> MessengerError {
        MessengerError::NotFound(format!("message {} in channel {}", message, channel))
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = MessageId(state.next_id);
        let posted = MockMessage {
            id,
            channel_id: channel,
            content: message.content,
            embed: message.embed,
            reactions: Vec::new(),
            crossposted: false,
        };
        state.sent.push(posted.clone());
        state.messages.insert(id, posted);
        Ok(id)
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<PostedMessage, MessengerError> {
        self.check_error().await?;

        let state = self.state.read().await;
        let found = state
            .messages
            .get(&message)
            .filter(|m| m.channel_id == channel)
            .ok_or_else(|| Self::not_found(channel, message))?;

        Ok(PostedMessage {
            id: found.id,
            channel_id: found.channel_id,
            content: found.content.clone().unwrap_or_default(),
            embeds: found.embed.clone().into_iter().collect(),
        })
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: Embed,
    ) -> Result<(), MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        let found = state
            .messages
            .get_mut(&message)
            .filter(|m| m.channel_id == channel)
            .ok_or_else(|| Self::not_found(channel, message))?;
        found.embed = Some(embed.clone());
        state.edits.push((message, embed));
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        if !state
            .messages
            .get(&message)
            .is_some_and(|m| m.channel_id == channel)
        {
            return Err(Self::not_found(channel, message));
        }
        state.messages.remove(&message);
        state.deleted.push(message);
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        let found = state
            .messages
            .get_mut(&message)
            .filter(|m| m.channel_id == channel)
            .ok_or_else(|| Self::not_found(channel, message))?;
        found.reactions.push(emoji.to_string());
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        if !state
            .messages
            .get(&message)
            .is_some_and(|m| m.channel_id == channel)
        {
            return Err(Self::not_found(channel, message));
        }
        state.removed_reactions.push(RemovedReaction {
            channel_id: channel,
            message_id: message,
            emoji: emoji.to_string(),
            user_id: user,
        });
        Ok(())
    }

    async fn clear_channel(&self, channel: ChannelId) -> Result<usize, MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        let ids: Vec<MessageId> = state
            .messages
            .values()
            .filter(|m| m.channel_id == channel)
            .map(|m| m.id)
            .collect();
        for id in &ids {
            state.messages.remove(id);
            state.deleted.push(*id);
        }
        Ok(ids.len())
    }

    async fn crosspost(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError> {
        self.check_error().await?;

        let mut state = self.state.write().await;
        let found = state
            .messages
            .get_mut(&message)
            .filter(|m| m.channel_id == channel)
            .ok_or_else(|| Self::not_found(channel, message))?;
        found.crossposted = true;
        Ok(())
    }

    fn message_link(&self, channel: ChannelId, message: MessageId) -> String {
        format!("https://discord.test/channels/{}/{}", channel, message)
    }
}
