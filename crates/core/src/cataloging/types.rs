//! Cataloging types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Invoker;
use crate::catalog::EntryId;
use crate::config::Config;
use crate::messenger::{ChannelId, MessengerError, RoleId, UserId};
use crate::mirror::{MirrorChannels, MirrorError, VoteReaction};
use crate::store::StoreError;
use crate::wizard::WizardError;

/// Everything the orchestrator needs to know about the guild layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogingContext {
    pub channels: MirrorChannels,
    pub announcements: Option<ChannelId>,
    pub announcement_role: Option<RoleId>,
    /// Reactions by this user are the bot's own and never count as votes.
    pub bot_user_id: Option<UserId>,
}

impl From<&Config> for CatalogingContext {
    fn from(config: &Config) -> Self {
        Self {
            channels: MirrorChannels::from(&config.channels),
            announcements: config.channels.announcements,
            announcement_role: config.mirror.announcement_role_id,
            bot_user_id: config.discord.bot_user_id,
        }
    }
}

/// A command from the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Command {
    /// Link to an entry's card.
    Search { token: String },
    /// Create an entry through the wizard.
    Add,
    /// Change one field of an entry through the wizard.
    Edit,
    Delete { token: String },
    /// Wipe both mirror channels and republish every entry.
    Rebuild,
    /// List a member's votes (the invoker's when no member is given).
    Votes {
        #[serde(default)]
        member: Option<UserId>,
    },
    /// Drop the ratings of everyone not in `membership`.
    CleanLeavers { membership: Vec<UserId> },
    /// Post an update announcement for an entry.
    Announce,
    /// Ranking; not implemented.
    Top,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Search { .. } => "search",
            Command::Add => "add",
            Command::Edit => "edit",
            Command::Delete { .. } => "delete",
            Command::Rebuild => "rebuild",
            Command::Votes { .. } => "votes",
            Command::CleanLeavers { .. } => "cleanleavers",
            Command::Announce => "announce",
            Command::Top => "top",
        }
    }

    /// Whether only staff may run this command.
    pub fn requires_staff(&self) -> bool {
        !matches!(self, Command::Search { .. } | Command::Votes { .. })
    }
}

/// Where a command was invoked and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub channel_id: ChannelId,
    pub invoker: Invoker,
}

/// What a reaction event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Recorded {
        entry_id: EntryId,
        reaction: VoteReaction,
    },
    Ignored,
}

#[derive(Debug, Error)]
pub enum CatalogingError {
    #[error("Permission denied for command {0}")]
    PermissionDenied(&'static str),

    #[error("No announcements channel configured")]
    AnnouncementsNotConfigured,

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}

impl CatalogingError {
    /// The sentence shown to the member who ran the command.
    pub fn user_message(&self) -> String {
        match self {
            CatalogingError::PermissionDenied(_) => {
                "You don't have permission to use this command.".to_string()
            }
            CatalogingError::AnnouncementsNotConfigured => {
                "Announcements are not configured.".to_string()
            }
            CatalogingError::Wizard(WizardError::Timeout) => "You took long. Aborting.".to_string(),
            CatalogingError::Wizard(WizardError::MalformedReply(detail)) => {
                format!("Invalid reply: {}. Aborting.", detail)
            }
            CatalogingError::Store(e) if e.is_not_found() => "Entry not found.".to_string(),
            _ => "Something went wrong, please try again later.".to_string(),
        }
    }

    /// Errors caused by the member rather than by the system.
    pub fn is_user_error(&self) -> bool {
        match self {
            CatalogingError::PermissionDenied(_)
            | CatalogingError::AnnouncementsNotConfigured
            | CatalogingError::Wizard(WizardError::Timeout)
            | CatalogingError::Wizard(WizardError::MalformedReply(_)) => true,
            CatalogingError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
