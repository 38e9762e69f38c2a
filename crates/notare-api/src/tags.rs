use anyhow::anyhow;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use notare_db::models::TagRow;
use notare_types::api::{CreateTagRequest, Links, TagResponse, UpdateTagRequest};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::policy;

pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_tags()?;
    let tags = rows
        .iter()
        .map(tag_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_tag(&tag_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("Tag with id={} not found", tag_id)))?;

    Ok(Json(tag_response(&row)?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth::authenticate(&state, &headers)?;
    if !policy::can_mutate_tag(&actor.role) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    if req.name.is_empty() {
        return Err(ApiError::BadRequest("tag name must not be empty".into()));
    }
    if state.db.get_tag_by_name(&req.name)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Tag with name {} already exists",
            req.name
        )));
    }

    let tag_id = Uuid::new_v4();
    state.db.create_tag(&tag_id.to_string(), &req.name)?;

    info!("Tag {} created by {}", req.name, actor.username);

    let row = state
        .db
        .get_tag(&tag_id.to_string())?
        .ok_or_else(|| anyhow!("tag vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(tag_response(&row)?)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth::authenticate(&state, &headers)?;

    state
        .db
        .get_tag(&tag_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("Tag with id={} not found", tag_id)))?;

    if !policy::can_mutate_tag(&actor.role) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    if let Some(existing) = state.db.get_tag_by_name(&req.name)? {
        if existing.id != tag_id.to_string() {
            return Err(ApiError::Conflict(format!(
                "Tag with name {} already exists",
                req.name
            )));
        }
    }

    state.db.update_tag(&tag_id.to_string(), &req.name)?;

    let row = state
        .db
        .get_tag(&tag_id.to_string())?
        .ok_or_else(|| anyhow!("tag vanished during update"))?;

    Ok(Json(tag_response(&row)?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth::authenticate(&state, &headers)?;

    state
        .db
        .get_tag(&tag_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("Tag with id={} not found", tag_id)))?;

    if !policy::can_mutate_tag(&actor.role) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    state.db.delete_tag(&tag_id.to_string())?;

    info!("Tag {} deleted by {}", tag_id, actor.username);
    Ok(Json(serde_json::json!({
        "msg": format!("Tag with id={} was deleted", tag_id),
    })))
}

pub(crate) fn tag_response(row: &TagRow) -> Result<TagResponse, ApiError> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt tag id '{}': {}", row.id, e))?;

    Ok(TagResponse {
        id,
        name: row.name.clone(),
        links: Links {
            self_: format!("/tags/{}", id),
            collection: "/tags".into(),
        },
    })
}
