use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::HeaderMap, http::header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use notare_db::Database;
use notare_types::api::{Claims, TokenResponse};

use crate::error::ApiError;
use crate::extract::Json;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

/// The authenticated caller, resolved from either Basic credentials or a
/// previously issued bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

/// GET /auth/token — exchange Basic credentials for a signed token.
/// Tokens are minted from primary credentials only, never from another token.
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing credentials".into()))?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or_else(|| ApiError::Unauthorized("Basic credentials required".into()))?;

    let (username, password) = decode_basic(encoded)?;
    let user = verify_basic(&state, &username, &password)?;
    let token = create_token(&state.jwt_secret, &user)?;
    Ok(Json(TokenResponse { token }))
}

/// Resolve the caller from the Authorization header. Accepts
/// `Basic user:password` (checked against the stored argon2 hash) and
/// `Bearer <jwt>` (issued by `issue_token`).
pub fn authenticate(state: &AppStateInner, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing credentials".into()))?;

    if let Some(encoded) = auth_header.strip_prefix("Basic ") {
        let (username, password) = decode_basic(encoded)?;
        return verify_basic(state, &username, &password);
    }

    if let Some(token) = auth_header.strip_prefix("Bearer ") {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized("invalid token".into()))?;

        let claims = token_data.claims;
        return Ok(CurrentUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        });
    }

    Err(ApiError::Unauthorized("unsupported auth scheme".into()))
}

fn decode_basic(encoded: &str) -> Result<(String, String), ApiError> {
    let decoded = B64
        .decode(encoded)
        .map_err(|_| ApiError::Unauthorized("malformed Basic credentials".into()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ApiError::Unauthorized("malformed Basic credentials".into()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| ApiError::Unauthorized("malformed Basic credentials".into()))?;
    Ok((username.to_string(), password.to_string()))
}

pub fn verify_basic(
    state: &AppStateInner,
    username: &str,
    password: &str,
) -> Result<CurrentUser, ApiError> {
    let user = state
        .db
        .get_user_by_username(username)?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow!("stored hash for {} unparseable: {}", user.username, e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("invalid credentials".into()))?;

    let id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt user id '{}': {}", user.id, e))?;

    Ok(CurrentUser {
        id,
        username: user.username,
        role: user.role,
    })
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn create_token(secret: &str, user: &CurrentUser) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
