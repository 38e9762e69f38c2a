use anyhow::anyhow;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use notare_db::models::UserRow;
use notare_types::api::{CreateUserRequest, Links, UpdateUserRequest, UserResponse};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::policy;

const ALLOWED_ROLES: [&str; 2] = ["user", "admin"];

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub username: String,
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_users()?;
    let users = rows
        .iter()
        .map(user_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let role = req.role.as_deref().unwrap_or("user");
    if !ALLOWED_ROLES.contains(&role) {
        return Err(ApiError::BadRequest(format!("unknown role '{}'", role)));
    }

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "User with username {} already exists",
            req.username
        )));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.username, &password_hash, role)?;

    info!("User {} created ({})", req.username, role);

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| anyhow!("user vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(user_response(&row)?)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("User with id={} not found", user_id)))?;

    Ok(Json(user_response(&row)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth::authenticate(&state, &headers)?;

    state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("User with id={} not found", user_id)))?;

    if !policy::can_update_user(&actor.role) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    if let Some(role) = req.role.as_deref() {
        if !ALLOWED_ROLES.contains(&role) {
            return Err(ApiError::BadRequest(format!("unknown role '{}'", role)));
        }
    }

    // A renamed user must not collide with an existing username
    if let Some(username) = req.username.as_deref() {
        if let Some(existing) = state.db.get_user_by_username(username)? {
            if existing.id != user_id.to_string() {
                return Err(ApiError::Conflict(format!(
                    "User with username {} already exists",
                    username
                )));
            }
        }
    }

    state.db.update_user(
        &user_id.to_string(),
        req.username.as_deref(),
        req.role.as_deref(),
    )?;

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| anyhow!("user vanished during update"))?;

    Ok(Json(user_response(&row)?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth::authenticate(&state, &headers)?;

    state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound(format!("User with id={} not found", user_id)))?;

    if !policy::can_delete_user(&actor.id.to_string(), &actor.role, &user_id.to_string()) {
        return Err(ApiError::Forbidden("Forbidden for this User".into()));
    }

    state.db.delete_user(&user_id.to_string())?;

    info!("User {} deleted by {}", user_id, actor.username);
    Ok(Json(serde_json::json!({
        "msg": format!("User with id={} was deleted", user_id),
    })))
}

pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.search_users(&query.username)?;
    let users = rows
        .iter()
        .map(user_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

pub(crate) fn user_response(row: &UserRow) -> Result<UserResponse, ApiError> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt user id '{}': {}", row.id, e))?;

    Ok(UserResponse {
        id,
        username: row.username.clone(),
        role: row.role.clone(),
        is_staff: row.is_staff,
        links: Links {
            self_: format!("/users/{}", id),
            collection: "/users".into(),
        },
    })
}
