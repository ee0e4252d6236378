use crate::catalog::CatalogEntry;
use crate::config::MirrorConfig;
use crate::ledger::{Tally, VoteDirection};
use crate::messenger::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage};

/// Card colour (Discord blurple).
pub const CARD_COLOR: u32 = 0x7289DA;

pub const RATINGS_FIELD: &str = "Current Ratings";
pub const ABBREVIATIONS_FIELD: &str = "Abbreviations";
pub const ANDROID_FIELD: &str = "Android Support";

/// The three reactions every mirror card carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteReaction {
    Up,
    Down,
    Cancel,
}

impl VoteReaction {
    /// In the order they are attached to a card.
    pub const ALL: [VoteReaction; 3] = [
        VoteReaction::Up,
        VoteReaction::Down,
        VoteReaction::Cancel,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            VoteReaction::Up => "👍",
            VoteReaction::Down => "👎",
            VoteReaction::Cancel => "❌",
        }
    }

    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.emoji() == emoji)
    }

    /// The vote this reaction casts; `None` withdraws the vote.
    pub fn direction(&self) -> Option<VoteDirection> {
        match self {
            VoteReaction::Up => Some(VoteDirection::Up),
            VoteReaction::Down => Some(VoteDirection::Down),
            VoteReaction::Cancel => None,
        }
    }

    /// Label used in logs and metrics.
    pub fn action(&self) -> &'static str {
        match self {
            VoteReaction::Up => "up",
            VoteReaction::Down => "down",
            VoteReaction::Cancel => "cancel",
        }
    }
}

/// Author line shown on every card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

impl From<&MirrorConfig> for CardAuthor {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            name: config.author_name.clone(),
            icon_url: config.author_icon_url.clone(),
        }
    }
}

impl CardAuthor {
    fn to_embed(&self) -> EmbedAuthor {
        EmbedAuthor {
            name: self.name.clone(),
            icon_url: self.icon_url.clone(),
        }
    }
}

pub fn abbreviations_text(abbreviations: &[String]) -> String {
    if abbreviations.is_empty() {
        "-".to_string()
    } else {
        abbreviations.join(", ")
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn field(name: &str, value: String) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value,
        inline: true,
    }
}

fn summary_fields(entry: &CatalogEntry, tally: Tally) -> Vec<EmbedField> {
    vec![
        field(RATINGS_FIELD, tally.to_string()),
        field(
            ABBREVIATIONS_FIELD,
            abbreviations_text(&entry.fields.abbreviations),
        ),
        field(
            ANDROID_FIELD,
            yes_no(entry.fields.android_supported).to_string(),
        ),
    ]
}

/// Render the mirror card for an entry.
pub fn render_card(entry: &CatalogEntry, tally: Tally, author: &CardAuthor) -> Embed {
    let fields = &entry.fields;
    Embed {
        title: Some(fields.name.clone()),
        url: Some(fields.store_link.clone()).filter(|l| !l.is_empty()),
        color: Some(CARD_COLOR),
        fields: summary_fields(entry, tally),
        image: Some(EmbedImage {
            url: fields.image_url.clone(),
        })
        .filter(|i| !i.url.is_empty()),
        author: Some(author.to_embed()),
        footer: Some(EmbedFooter {
            text: format!("{}, by {}", fields.name, fields.authors.join(", ")),
        }),
    }
}

/// Render an update announcement for an entry.
pub fn render_announcement(
    entry: &CatalogEntry,
    tally: Tally,
    title: &str,
    url: &str,
    author: &CardAuthor,
) -> Embed {
    Embed {
        title: Some(format!("{}: {}", entry.fields.name, title)),
        url: Some(url.to_string()).filter(|u| !u.is_empty()),
        color: Some(CARD_COLOR),
        fields: summary_fields(entry, tally),
        image: None,
        author: Some(author.to_embed()),
        footer: None,
    }
}
