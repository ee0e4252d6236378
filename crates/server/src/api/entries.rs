//! Read-only catalog view.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use curator_core::{CatalogEntry, CatalogStore, EntryId, RatingLedger, StoreError, Tally};

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub tally: Tally,
}

#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    pub entries: Vec<EntryResponse>,
    pub total: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn store_error(e: StoreError) -> ApiError {
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn with_tally(state: &AppState, entry: CatalogEntry) -> Result<EntryResponse, ApiError> {
    let tally = state.store().tally(entry.id).map_err(store_error)?;
    Ok(EntryResponse { entry, tally })
}

/// List every entry in creation order
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    let entries = state
        .store()
        .list()
        .map_err(store_error)?
        .into_iter()
        .map(|entry| with_tally(&state, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ListEntriesResponse {
        total: entries.len(),
        entries,
    }))
}

/// Get an entry by ID
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.store().get(EntryId(id)).map_err(store_error)?;
    Ok(Json(with_tally(&state, entry)?))
}
