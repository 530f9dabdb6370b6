//! Route definitions for `/staff-roles`.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::staff_roles;
use crate::state::AppState;

/// Routes mounted at `/staff-roles`. Admin only.
///
/// ```text
/// GET    /       -> list
/// POST   /       -> create
/// PUT    /{id}   -> update
/// DELETE /{id}   -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(staff_roles::list).post(staff_roles::create))
        .route("/{id}", put(staff_roles::update).delete(staff_roles::delete))
}
