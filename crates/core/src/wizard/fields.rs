//! The seven entry fields the wizard collects and how replies are parsed.

use super::WizardError;
use crate::catalog::EntryFields;
use crate::messenger::IncomingMessage;

/// An editable entry field, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Name,
    Abbreviations,
    Authors,
    StoreLink,
    Image,
    AndroidSupported,
    Undetermined,
}

impl EntryField {
    pub const ALL: [EntryField; 7] = [
        EntryField::Name,
        EntryField::Abbreviations,
        EntryField::Authors,
        EntryField::StoreLink,
        EntryField::Image,
        EntryField::AndroidSupported,
        EntryField::Undetermined,
    ];

    /// Map an edit-selector reply (`1`..=`7`) to a field.
    pub fn from_selector(reply: &str) -> Option<Self> {
        let choice: usize = reply.trim().parse().ok()?;
        choice
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryField::Name => "Name",
            EntryField::Abbreviations => "Abbreviations",
            EntryField::Authors => "Authors",
            EntryField::StoreLink => "Store Link",
            EntryField::Image => "Image",
            EntryField::AndroidSupported => "Android Support",
            EntryField::Undetermined => "Is undetermined?",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            EntryField::Name => "What's the name of the entry?",
            EntryField::Abbreviations => {
                "What are the abbreviations that this entry will be known for? \
                 Enter them separated by spaces. If there are no abbreviations, type \"none\""
            }
            EntryField::Authors => {
                "Who are the owners of this entry? Enter their names separated by commas."
            }
            EntryField::StoreLink => "What is the store link? (itch.io, Steam, etc)",
            EntryField::Image => "Please upload an image to use as a preview",
            EntryField::AndroidSupported => {
                "Does this entry work on Android phones? Type yes or no."
            }
            EntryField::Undetermined => "Is it an undetermined entry? Type yes or no.",
        }
    }

    /// Parse a reply for this field.
    pub fn parse(&self, reply: &IncomingMessage) -> Result<FieldValue, WizardError> {
        let text = reply.content.trim();
        Ok(match self {
            EntryField::Name => {
                if text.is_empty() {
                    return Err(WizardError::MalformedReply(
                        "the name cannot be empty".to_string(),
                    ));
                }
                FieldValue::Name(text.to_string())
            }
            EntryField::Abbreviations => FieldValue::Abbreviations(parse_abbreviations(text)),
            EntryField::Authors => FieldValue::Authors(parse_authors(text)),
            EntryField::StoreLink => FieldValue::StoreLink(text.to_string()),
            EntryField::Image => match reply.attachments.as_slice() {
                [attachment] => FieldValue::Image(attachment.url.clone()),
                _ => {
                    return Err(WizardError::MalformedReply(
                        "expected exactly one image attachment".to_string(),
                    ))
                }
            },
            EntryField::AndroidSupported => FieldValue::AndroidSupported(is_yes(text)),
            EntryField::Undetermined => FieldValue::Undetermined(is_yes(text)),
        })
    }
}

/// The prompt for the edit selector step.
pub fn selector_prompt() -> String {
    let mut prompt =
        "What do you want to edit about the entry? Input the corresponding number.".to_string();
    for (index, field) in EntryField::ALL.iter().enumerate() {
        prompt.push_str(&format!("\n{}. {}", index + 1, field.label()));
    }
    prompt
}

/// A parsed value for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Name(String),
    Abbreviations(Vec<String>),
    Authors(Vec<String>),
    StoreLink(String),
    Image(String),
    AndroidSupported(bool),
    Undetermined(bool),
}

impl FieldValue {
    pub fn apply(self, fields: &mut EntryFields) {
        match self {
            FieldValue::Name(v) => fields.name = v,
            FieldValue::Abbreviations(v) => fields.abbreviations = v,
            FieldValue::Authors(v) => fields.authors = v,
            FieldValue::StoreLink(v) => fields.store_link = v,
            FieldValue::Image(v) => fields.image_url = v,
            FieldValue::AndroidSupported(v) => fields.android_supported = v,
            FieldValue::Undetermined(v) => fields.undetermined = v,
        }
    }
}

fn parse_abbreviations(text: &str) -> Vec<String> {
    if text.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn parse_authors(text: &str) -> Vec<String> {
    text.split(',').map(|a| a.trim().to_string()).collect()
}

fn is_yes(text: &str) -> bool {
    text.to_lowercase().contains("yes")
}
