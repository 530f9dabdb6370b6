//! Route definitions for `/invites`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::invites;
use crate::state::AppState;

/// Routes mounted at `/invites`.
///
/// ```text
/// POST /               -> create (staff)
/// GET  /queue          -> list_pending (staff)
/// POST /accept         -> accept (public)
/// GET  /{id}           -> get_by_id (staff)
/// POST /{id}/revoke    -> revoke (staff)
/// POST /{id}/resend    -> resend (staff)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(invites::create))
        .route("/queue", get(invites::list_pending))
        .route("/accept", post(invites::accept))
        .route("/{id}", get(invites::get_by_id))
        .route("/{id}/revoke", post(invites::revoke))
        .route("/{id}/resend", post(invites::resend))
}
