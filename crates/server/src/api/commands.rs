//! Commands forwarded by the relay.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use curator_core::{Command, CommandContext};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    pub context: CommandContext,
    pub command: Command,
}

#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub command: &'static str,
}

/// Start a command in the background.
///
/// Commands may wait minutes on wizard replies, so the reply to the member is
/// sent to the invoking channel rather than returned here.
pub async fn post_command(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandBody>,
) -> (StatusCode, Json<CommandAccepted>) {
    let name = body.command.name();
    info!(
        command = name,
        user = %body.context.invoker.user_id,
        channel = %body.context.channel_id,
        "Command received"
    );

    let cataloger = Arc::clone(state.cataloger());
    tokio::spawn(async move {
        if let Err(e) = cataloger.run(&body.context, body.command).await {
            debug!(command = name, error = %e, "Command finished with error");
        }
    });

    (StatusCode::ACCEPTED, Json(CommandAccepted { command: name }))
}
