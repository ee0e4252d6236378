//! Input wizard: collects entry fields one chat reply at a time.
//!
//! Each step prompts in the invoking channel and waits for the next message
//! from the same user there. Any step running out of time aborts the whole
//! session; nothing collected so far is kept.

mod fields;
mod hub;

pub use fields::{selector_prompt, EntryField, FieldValue};
pub use hub::{PendingReply, ReplyHub};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::catalog::EntryFields;
use crate::messenger::{ChannelId, IncomingMessage, Messenger, MessengerError, UserId};
use crate::metrics;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("No reply within the time limit")]
    Timeout,

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Wizard session was cancelled")]
    Cancelled,

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}

impl WizardError {
    fn outcome(&self) -> &'static str {
        match self {
            WizardError::Timeout => "timeout",
            WizardError::MalformedReply(_) => "malformed",
            WizardError::Cancelled | WizardError::Messenger(_) => "failed",
        }
    }
}

fn record<T>(flow: &str, result: &Result<T, WizardError>) {
    let outcome = match result {
        Ok(_) => "completed",
        Err(e) => e.outcome(),
    };
    metrics::WIZARD_SESSIONS
        .with_label_values(&[flow, outcome])
        .inc();
}

/// Runs wizard sessions against a messenger.
pub struct Wizard {
    hub: ReplyHub,
    messenger: Arc<dyn Messenger>,
    timeout: Duration,
}

impl Wizard {
    pub fn new(hub: ReplyHub, messenger: Arc<dyn Messenger>, timeout: Duration) -> Self {
        Self {
            hub,
            messenger,
            timeout,
        }
    }

    /// The hub incoming messages must be offered to.
    pub fn hub(&self) -> &ReplyHub {
        &self.hub
    }

    /// Send a prompt and wait for the author's next message in that channel.
    pub async fn ask(
        &self,
        channel: ChannelId,
        author: UserId,
        prompt: &str,
    ) -> Result<IncomingMessage, WizardError> {
        let pending = self.hub.register(channel, author);
        self.messenger.send_text(channel, prompt).await?;
        let reply = pending.recv(self.timeout).await?;
        debug!(channel = %channel, author = %author, "Wizard step answered");
        Ok(reply)
    }

    /// Like [`Wizard::ask`] but returns the trimmed reply text.
    pub async fn ask_text(
        &self,
        channel: ChannelId,
        author: UserId,
        prompt: &str,
    ) -> Result<String, WizardError> {
        let reply = self.ask(channel, author, prompt).await?;
        Ok(reply.content.trim().to_string())
    }

    async fn collect_field(
        &self,
        channel: ChannelId,
        author: UserId,
        field: EntryField,
    ) -> Result<FieldValue, WizardError> {
        let reply = self.ask(channel, author, field.prompt()).await?;
        field.parse(&reply)
    }

    /// Collect all seven fields for a new entry, in order.
    pub async fn collect_create(
        &self,
        channel: ChannelId,
        author: UserId,
    ) -> Result<EntryFields, WizardError> {
        let result = async {
            let mut fields = EntryFields::default();
            for field in EntryField::ALL {
                self.collect_field(channel, author, field)
                    .await?
                    .apply(&mut fields);
            }
            Ok::<_, WizardError>(fields)
        }
        .await;
        record("create", &result);
        result
    }

    /// Ask which field to change, then collect that one field.
    pub async fn collect_edit(
        &self,
        channel: ChannelId,
        author: UserId,
    ) -> Result<FieldValue, WizardError> {
        let result = async {
            let choice = self.ask(channel, author, &selector_prompt()).await?;
            let field = EntryField::from_selector(&choice.content).ok_or_else(|| {
                WizardError::MalformedReply(format!(
                    "'{}' is not a number from 1 to {}",
                    choice.content.trim(),
                    EntryField::ALL.len()
                ))
            })?;
            Ok::<_, WizardError>(self.collect_field(channel, author, field).await?)
        }
        .await;
        record("edit", &result);
        result
    }
}
