use anyhow::anyhow;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use notare_types::api::UploadResponse;

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// PUT /upload?filename= — store the raw request body under the upload
/// directory. The stored file is served back from `GET /uploads/{filename}`.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth::authenticate(&state, &headers)?;

    let name = sanitize_filename(&query.filename)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid filename '{}'", query.filename)))?;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| anyhow!("upload dir unavailable: {}", e))?;

    let path = state.upload_dir.join(name);
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| anyhow!("failed to store {}: {}", path.display(), e))?;

    info!("{} uploaded {} ({} bytes)", user.username, name, body.len());

    Ok(Json(UploadResponse {
        msg: "uploaded file successfully".into(),
        url: format!("/uploads/{}", name),
    }))
}

/// GET /uploads/{filename} — stream a stored file back.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = sanitize_filename(&filename)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid filename '{}'", filename)))?;

    let path = state.upload_dir.join(name);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("File {} not found", name)))?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    ))
}

/// Uploaded names must stay inside the upload directory: no separators,
/// no parent traversal, nothing hidden.
fn sanitize_filename(raw: &str) -> Option<&str> {
    if raw.is_empty() || raw.starts_with('.') {
        return None;
    }
    if raw.contains('/') || raw.contains('\\') || raw.contains("..") {
        return None;
    }
    Some(raw)
}
