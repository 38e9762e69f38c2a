pub mod auth;
pub mod error;
pub mod extract;
pub mod notes;
pub mod policy;
pub mod tags;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, put},
};

use auth::AppState;

/// Assemble the full route table. Handlers that require a caller do their
/// own credential resolution (Basic or Bearer) because most paths mix
/// public and protected verbs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/token", get(auth::issue_token))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/search", get(users::search_users))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/public/filter", get(notes::public_filter))
        .route(
            "/notes/{note_id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/notes/{note_id}/tags",
            put(notes::set_tags).delete(notes::remove_tags),
        )
        .route("/notes/{note_id}/archive", delete(notes::archive_note))
        .route("/notes/{note_id}/restore", put(notes::restore_note))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/{tag_id}",
            get(tags::get_tag)
                .put(tags::update_tag)
                .delete(tags::delete_tag),
        )
        .route("/upload", put(uploads::upload))
        .route("/uploads/{filename}", get(uploads::download))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health — liveness check (no auth).
async fn health() -> &'static str {
    "ok"
}
