use anyhow::anyhow;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use notare_db::models::NoteRow;
use notare_types::api::{CreateNoteRequest, Links, NoteResponse, NoteTagsRequest, UpdateNoteRequest};

use crate::auth::{self, AppState, CurrentUser};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::policy;
use crate::tags::tag_response;

#[derive(Debug, Deserialize)]
pub struct PublicFilterQuery {
    pub tag: Option<String>,
}

/// GET /notes — the caller's own notes, in creation order.
pub async fn list_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;

    let rows = state.db.list_notes_by_author(&author.id.to_string())?;
    let notes = rows
        .iter()
        .map(|row| note_response(&state, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;

    let note_id = Uuid::new_v4();
    state.db.create_note(
        &note_id.to_string(),
        &author.id.to_string(),
        &req.text,
        req.private,
    )?;

    info!("Note {} created by {}", note_id, author.username);

    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| anyhow!("note vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(note_response(&state, &row)?)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    let row = fetch_owned_note(&state, &author, note_id)?;
    Ok(Json(note_response(&state, &row)?))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    fetch_owned_note(&state, &author, note_id)?;

    state
        .db
        .update_note(&note_id.to_string(), req.text.as_deref(), req.private)?;

    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| anyhow!("note vanished during update"))?;

    Ok(Json(note_response(&state, &row)?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    fetch_owned_note(&state, &author, note_id)?;

    state.db.delete_note(&note_id.to_string())?;

    info!("Note {} deleted by {}", note_id, author.username);
    Ok(Json(serde_json::json!({
        "msg": format!("Note with id={} was deleted", note_id),
    })))
}

/// PUT /notes/{id}/tags — associate tags. Unresolved ids are skipped.
pub async fn set_tags(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<NoteTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    fetch_owned_note(&state, &author, note_id)?;

    let tag_ids: Vec<String> = req.tags.iter().map(Uuid::to_string).collect();
    state.db.add_tags_to_note(&note_id.to_string(), &tag_ids)?;

    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| anyhow!("note vanished during tag update"))?;

    Ok(Json(note_response(&state, &row)?))
}

/// DELETE /notes/{id}/tags — dissociate tags. Missing associations are a no-op.
pub async fn remove_tags(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<NoteTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    fetch_owned_note(&state, &author, note_id)?;

    let tag_ids: Vec<String> = req.tags.iter().map(Uuid::to_string).collect();
    state.db.remove_tags_from_note(&note_id.to_string(), &tag_ids)?;

    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| anyhow!("note vanished during tag update"))?;

    Ok(Json(note_response(&state, &row)?))
}

/// DELETE /notes/{id}/archive — move the caller's note to the archive.
pub async fn archive_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    set_archived(state, note_id, headers, true).await
}

/// PUT /notes/{id}/restore — bring a note back from the archive.
pub async fn restore_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    set_archived(state, note_id, headers, false).await
}

async fn set_archived(
    state: AppState,
    note_id: Uuid,
    headers: HeaderMap,
    archived: bool,
) -> Result<Json<NoteResponse>, ApiError> {
    let author = auth::authenticate(&state, &headers)?;
    fetch_owned_note(&state, &author, note_id)?;

    state.db.set_note_archived(&note_id.to_string(), archived)?;

    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| anyhow!("note vanished during archive update"))?;

    Ok(Json(note_response(&state, &row)?))
}

/// GET /notes/public/filter — non-private, non-archived notes from all users,
/// optionally narrowed to a tag name. No authentication required.
pub async fn public_filter(
    State(state): State<AppState>,
    Query(query): Query<PublicFilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_public_notes(query.tag.as_deref())?;
    let notes = rows
        .iter()
        .map(|row| note_response(&state, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(notes))
}

/// Resolve a note, reporting not-found before the ownership check.
fn fetch_owned_note(
    state: &AppState,
    author: &CurrentUser,
    note_id: Uuid,
) -> Result<NoteRow, ApiError> {
    let row = state
        .db
        .get_note(&note_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("Note with id={} not found", note_id)))?;

    if !policy::owns_note(&author.id.to_string(), &row.author_id) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    Ok(row)
}

fn note_response(state: &AppState, row: &NoteRow) -> Result<NoteResponse, ApiError> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt note id '{}': {}", row.id, e))?;
    let author_id: Uuid = row
        .author_id
        .parse()
        .map_err(|e| anyhow!("corrupt author id '{}': {}", row.author_id, e))?;

    let tags = state
        .db
        .get_tags_for_note(&row.id)?
        .iter()
        .map(tag_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NoteResponse {
        id,
        author_id,
        text: row.text.clone(),
        private: row.private,
        archived: row.archived,
        tags,
        created_at: row.created_at.clone(),
        links: Links {
            self_: format!("/notes/{}", id),
            collection: "/notes".into(),
        },
    })
}
