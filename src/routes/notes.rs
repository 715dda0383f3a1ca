/// Note Routes
///
/// Every handler requires an authenticated user and only ever touches that
/// user's notes. A note owned by someone else looks the same as a missing one.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, DatabaseError, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::notes::{Note, NoteId, NoteRepository};
use crate::validators::is_valid_title;

#[derive(Deserialize)]
pub struct NoteRequest {
    /// Present when updating an existing note
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub color: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub color: i64,
    pub created_at: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.to_string(),
            title: note.title,
            content: note.content,
            color: note.color,
            created_at: note.created_at.to_rfc3339(),
        }
    }
}

fn note_not_found() -> AppError {
    DatabaseError::NotFound("Note not found".to_string()).into()
}

fn parse_note_id(raw: &str) -> Result<NoteId, AppError> {
    NoteId::parse(raw).map_err(|_| ValidationError::InvalidFormat("id").into())
}

/// POST /notes
///
/// Creates a note, or updates it when `id` names one of the caller's notes.
pub async fn save_note(
    user: AuthenticatedUser,
    body: web::Json<NoteRequest>,
    notes: web::Data<dyn NoteRepository>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let title = is_valid_title(&body.title)?;
    let id = match body.id.as_deref() {
        Some(raw) => parse_note_id(raw)?,
        None => NoteId::generate(),
    };

    let note = Note {
        id,
        owner_id: user.user_id,
        title,
        content: body.content,
        color: body.color,
        created_at: Utc::now(),
    };

    let saved = notes.save(note).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user.user_id, note_id = %id, "Save rejected: note owned by another user");
        note_not_found()
    })?;

    tracing::info!(user_id = %user.user_id, note_id = %saved.id, "Note saved");
    Ok(HttpResponse::Ok().json(NoteResponse::from(saved)))
}

/// GET /notes
pub async fn list_notes(
    user: AuthenticatedUser,
    notes: web::Data<dyn NoteRepository>,
) -> Result<HttpResponse, AppError> {
    let owned: Vec<NoteResponse> = notes
        .find_by_owner_id(&user.user_id)
        .await?
        .into_iter()
        .map(NoteResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(owned))
}

/// DELETE /notes/{id}
pub async fn delete_note(
    user: AuthenticatedUser,
    path: web::Path<String>,
    notes: web::Data<dyn NoteRepository>,
) -> Result<HttpResponse, AppError> {
    let id = parse_note_id(&path.into_inner())?;

    match notes.find_by_id(&id).await? {
        Some(note) if note.owner_id == user.user_id => {}
        _ => return Err(note_not_found()),
    }

    if !notes.delete_by_id(&id).await? {
        return Err(note_not_found());
    }

    tracing::info!(user_id = %user.user_id, note_id = %id, "Note deleted");
    Ok(HttpResponse::NoContent().finish())
}
