use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims carried by tokens issued from `GET /auth/token`. The role is baked
/// into the token so protected handlers don't need a user lookup per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Hyperlinks --

/// `_links` block attached to user and tag bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_: String,
    pub collection: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub is_staff: bool,
    #[serde(rename = "_links")]
    pub links: Links,
}

// -- Notes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNoteRequest {
    pub text: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNoteRequest {
    pub text: Option<String>,
    pub private: Option<bool>,
}

/// Body for `PUT`/`DELETE /notes/{id}/tags`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteTagsRequest {
    pub tags: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub private: bool,
    pub archived: bool,
    pub tags: Vec<TagResponse>,
    pub created_at: String,
    #[serde(rename = "_links")]
    pub links: Links,
}

// -- Tags --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTagRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTagRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "_links")]
    pub links: Links,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub msg: String,
    pub url: String,
}
