//! Note CRUD for an admitted identity.
//!
//! Every operation is scoped to the caller's subject. A note owned by
//! another principal is reported as not found.

use crate::auth::Identity;
use crate::errors::GatewayError;
use crate::models::{NoteRequest, NoteResponse};
use crate::repositories::{Note, NoteStore, LATEST_NOTES_LIMIT};
use chrono::{DateTime, Utc};
use common::types::NoteId;
use tracing::instrument;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 30;

/// Maximum content length in characters.
pub const MAX_CONTENT_CHARS: usize = 255;

fn validate(request: &NoteRequest) -> Result<(), GatewayError> {
    if request.title.trim().is_empty() {
        return Err(GatewayError::BadRequest("Title must not be blank".to_string()));
    }
    if request.title.chars().count() > MAX_TITLE_CHARS {
        return Err(GatewayError::BadRequest(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if request.content.chars().count() > MAX_CONTENT_CHARS {
        return Err(GatewayError::BadRequest(format!(
            "Content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}

fn parse_note_id(raw: &str) -> Result<NoteId, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::NotFound("Note not found".to_string()))
}

#[instrument(skip_all, name = "gateway.services.notes.create")]
pub async fn create_note(
    notes: &dyn NoteStore,
    owner: &Identity,
    request: NoteRequest,
    now: DateTime<Utc>,
) -> Result<NoteResponse, GatewayError> {
    validate(&request)?;

    let note = Note {
        id: NoteId::new(),
        owner: owner.subject().to_string(),
        title: request.title,
        content: request.content,
        created_at: now,
        expires_at: request.expires_at,
    };
    notes.insert(note.clone()).await?;

    tracing::debug!(target: "gateway.services.notes", note_id = %note.id, "Note created");
    Ok(note.into())
}

/// Replace title, content and expiry of an owned note.
#[instrument(skip_all, name = "gateway.services.notes.update")]
pub async fn update_note(
    notes: &dyn NoteStore,
    owner: &Identity,
    note_id: &str,
    request: NoteRequest,
) -> Result<NoteResponse, GatewayError> {
    validate(&request)?;
    let id = parse_note_id(note_id)?;

    let Some(existing) = notes.find_owned(owner.subject(), id).await? else {
        return Err(GatewayError::NotFound("Note not found".to_string()));
    };

    let updated = Note {
        title: request.title,
        content: request.content,
        expires_at: request.expires_at,
        ..existing
    };

    // Lost a race with a concurrent delete.
    if !notes.update_owned(owner.subject(), updated.clone()).await? {
        return Err(GatewayError::NotFound("Note not found".to_string()));
    }

    Ok(updated.into())
}

#[instrument(skip_all, name = "gateway.services.notes.delete")]
pub async fn delete_note(
    notes: &dyn NoteStore,
    owner: &Identity,
    note_id: &str,
) -> Result<(), GatewayError> {
    let id = parse_note_id(note_id)?;

    if !notes.delete_owned(owner.subject(), id).await? {
        return Err(GatewayError::NotFound("Note not found".to_string()));
    }

    tracing::debug!(target: "gateway.services.notes", note_id = %id, "Note deleted");
    Ok(())
}

/// Live notes of the caller, newest first.
#[instrument(skip_all, name = "gateway.services.notes.latest")]
pub async fn latest_notes(
    notes: &dyn NoteStore,
    owner: &Identity,
    now: DateTime<Utc>,
) -> Result<Vec<NoteResponse>, GatewayError> {
    let latest = notes
        .latest_for_owner(owner.subject(), now, LATEST_NOTES_LIMIT)
        .await?;
    Ok(latest.into_iter().map(NoteResponse::from).collect())
}
