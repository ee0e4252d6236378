//! Routing of chat replies to the wizard sessions waiting on them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use super::WizardError;
use crate::messenger::{ChannelId, IncomingMessage, UserId};

struct Registration {
    id: u64,
    channel: ChannelId,
    author: UserId,
    sender: oneshot::Sender<IncomingMessage>,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    waiting: Vec<Registration>,
}

type SharedState = Arc<Mutex<HubState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, HubState> {
    // No critical section can panic midway, so poisoned data is still consistent.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hands incoming messages to wizard sessions waiting for a reply.
///
/// A session registers interest in the next message from one user in one
/// channel; the first such message resolves it. Messages nobody waits for
/// are left for other handlers.
#[derive(Clone, Default)]
pub struct ReplyHub {
    state: SharedState,
}

impl ReplyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for the next message from `author` in `channel`.
    ///
    /// Register before prompting so a fast reply cannot slip past.
    pub fn register(&self, channel: ChannelId, author: UserId) -> PendingReply {
        let (sender, receiver) = oneshot::channel();
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.waiting.push(Registration {
            id,
            channel,
            author,
            sender,
        });

        PendingReply {
            id,
            receiver,
            state: self.state.clone(),
        }
    }

    /// Offer a message to the waiting sessions.
    ///
    /// Resolves the oldest matching registration and returns whether the
    /// message was consumed.
    pub fn deliver(&self, message: &IncomingMessage) -> bool {
        let mut state = lock(&self.state);
        while let Some(index) = state
            .waiting
            .iter()
            .position(|r| r.channel == message.channel_id && r.author == message.author_id)
        {
            let registration = state.waiting.remove(index);
            if registration.sender.send(message.clone()).is_ok() {
                debug!(
                    channel = %message.channel_id,
                    author = %message.author_id,
                    "Delivered wizard reply"
                );
                return true;
            }
        }
        false
    }

    /// Number of sessions currently waiting for a reply.
    pub fn waiting(&self) -> usize {
        lock(&self.state).waiting.len()
    }
}

/// A registered wait for one reply.
///
/// Dropping it, whether after a timeout or because the session was
/// abandoned, withdraws the registration.
pub struct PendingReply {
    id: u64,
    receiver: oneshot::Receiver<IncomingMessage>,
    state: SharedState,
}

impl PendingReply {
    /// Wait for the reply, giving up after `timeout`.
    pub async fn recv(mut self, timeout: Duration) -> Result<IncomingMessage, WizardError> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(WizardError::Cancelled),
            Err(_) => Err(WizardError::Timeout),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        let id = self.id;
        lock(&self.state).waiting.retain(|r| r.id != id);
    }
}
