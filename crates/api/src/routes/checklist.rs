//! Route definitions for `/checklist`.

use axum::routing::{post, put};
use axum::Router;

use crate::handlers::checklist;
use crate::state::AppState;

/// Routes mounted at `/checklist`.
///
/// ```text
/// PUT    /{id}                  -> update (staff)
/// DELETE /{id}                  -> delete (staff)
/// POST   /{id}/not-applicable   -> set_not_applicable (upload)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(checklist::update).delete(checklist::delete))
        .route("/{id}/not-applicable", post(checklist::set_not_applicable))
}
