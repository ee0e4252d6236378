//! Types for the messaging boundary.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Platform snowflakes arrive either as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snowflake {
    Number(u64),
    Text(String),
}

fn deserialize_snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Snowflake::deserialize(deserializer)? {
        Snowflake::Number(n) => Ok(n),
        Snowflake::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_snowflake(deserializer).map(Self)
            }
        }
    };
}

platform_id!(
    /// A text channel.
    ChannelId
);
platform_id!(
    /// A posted message.
    MessageId
);
platform_id!(
    /// A user or guild member.
    UserId
);
platform_id!(
    /// A guild role.
    RoleId
);

/// A field in a rendered card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Rich card attached to a message.
///
/// Serializes to the shape the Discord API expects, so the same value is
/// used for rendering, for the wire and for reading a posted card back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    /// Value of the first field with the given name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Replace the value of a named field, leaving every other field as is.
    ///
    /// A missing field is inserted at the front.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>, inline: bool) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.insert(
                0,
                EmbedField {
                    name: name.to_string(),
                    value,
                    inline,
                },
            ),
        }
    }
}

/// A message about to be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A message as it currently exists on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// A file attached to an incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A chat message written by a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A member reacting to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
}

/// Errors from the messaging platform.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MessengerError {
    /// Whether the target message (or channel) no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Name of this messenger implementation.
    fn name(&self) -> &str;

    /// Post a new message, returning its id.
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, MessengerError>;

    /// Read a posted message back.
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<PostedMessage, MessengerError>;

    /// Replace the card of a posted message.
    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: Embed,
    ) -> Result<(), MessengerError>;

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError>;

    /// React to a message as the bot.
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), MessengerError>;

    /// Remove one user's reaction from a message.
    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), MessengerError>;

    /// Delete every message in a channel, returning how many were removed.
    async fn clear_channel(&self, channel: ChannelId) -> Result<usize, MessengerError>;

    /// Publish an announcement-channel message to following channels.
    async fn crosspost(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError>;

    /// Permanent link to a message.
    fn message_link(&self, channel: ChannelId, message: MessageId) -> String;

    /// Post a plain text message.
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId, MessengerError> {
        self.send_message(channel, OutgoingMessage::text(text)).await
    }
}
