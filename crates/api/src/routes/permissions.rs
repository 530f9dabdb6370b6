//! Route definitions for `/permissions`.

use axum::routing::get;
use axum::Router;

use crate::handlers::permissions;
use crate::state::AppState;

/// Routes mounted at `/permissions`. Admin only.
///
/// ```text
/// GET /client/{account_id}/acl   -> get_acl
/// PUT /client/{account_id}/acl   -> replace_acl
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/client/{account_id}/acl",
        get(permissions::get_acl).put(permissions::replace_acl),
    )
}
