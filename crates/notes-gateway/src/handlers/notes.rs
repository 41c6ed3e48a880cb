//! Note handlers. All routes here sit behind the admission pipeline.

use crate::auth::Identity;
use crate::errors::GatewayError;
use crate::models::{NoteRequest, NoteResponse};
use crate::routes::AppState;
use crate::services::note_service;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/notes
#[instrument(skip_all, name = "gateway.handlers.notes.create")]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<NoteResponse>, GatewayError> {
    let note =
        note_service::create_note(state.notes.as_ref(), &identity, request, state.clock.now())
            .await?;
    Ok(Json(note))
}

/// Handler for PUT /api/notes/:id
///
/// 404 if the note is absent or owned by someone else.
#[instrument(skip_all, name = "gateway.handlers.notes.update")]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<NoteResponse>, GatewayError> {
    let note = note_service::update_note(state.notes.as_ref(), &identity, &id, request).await?;
    Ok(Json(note))
}

/// Handler for DELETE /api/notes/:id
///
/// 204 on success, 404 if the note is absent or owned by someone else.
#[instrument(skip_all, name = "gateway.handlers.notes.delete")]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    note_service::delete_note(state.notes.as_ref(), &identity, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/notes/latest
#[instrument(skip_all, name = "gateway.handlers.notes.latest")]
pub async fn latest_notes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<NoteResponse>>, GatewayError> {
    let notes =
        note_service::latest_notes(state.notes.as_ref(), &identity, state.clock.now()).await?;
    Ok(Json(notes))
}
