//! Route definitions for `/documents`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::documents;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// POST   /upload          -> upload (multipart, upload)
/// GET    /{id}/download   -> download (view)
/// DELETE /{id}            -> delete (upload)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(documents::upload))
        .route("/{id}/download", get(documents::download))
        .route("/{id}", delete(documents::delete))
}
