use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{commands, entries, events, handlers, middleware as mw};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything the relay calls needs its secret
    let relay_routes = Router::new()
        .route("/config", get(handlers::get_config))
        // Platform events
        .route("/events/message", post(events::post_message))
        .route("/events/reaction", post(events::post_reaction))
        // Commands
        .route("/commands", post(commands::post_command))
        // Catalog (read-only)
        .route("/entries", get(entries::list_entries))
        .route("/entries/{id}", get(entries::get_entry))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::relay_auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(relay_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(mw::metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
