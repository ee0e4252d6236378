//! Platform events forwarded by the relay.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use curator_core::{IncomingMessage, ReactionEvent, ReactionOutcome};

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageEventResponse {
    /// Whether a wizard session took the message as its reply.
    pub consumed: bool,
}

#[derive(Debug, Serialize)]
pub struct ReactionEventResponse {
    /// "recorded" or "ignored"
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
}

impl From<ReactionOutcome> for ReactionEventResponse {
    fn from(outcome: ReactionOutcome) -> Self {
        match outcome {
            ReactionOutcome::Recorded { entry_id, reaction } => Self {
                outcome: "recorded",
                entry_id: Some(entry_id.0),
                action: Some(reaction.action()),
            },
            ReactionOutcome::Ignored => Self {
                outcome: "ignored",
                entry_id: None,
                action: None,
            },
        }
    }
}

/// Offer a chat message to waiting wizard sessions.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<IncomingMessage>,
) -> Json<MessageEventResponse> {
    Json(MessageEventResponse {
        consumed: state.cataloger().handle_message(&message),
    })
}

/// Apply a reaction on a mirror card.
pub async fn post_reaction(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ReactionEvent>,
) -> Result<Json<ReactionEventResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.cataloger().handle_reaction(&event).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!(message = %event.message_id, error = %e, "Failed to handle reaction");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
