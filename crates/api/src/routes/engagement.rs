//! Route definitions for `/engagement`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::engagement;
use crate::state::AppState;

/// Routes mounted at `/engagement`. The id is the tax year's.
///
/// ```text
/// GET  /{id}        -> get (view)
/// POST /{id}/sign   -> sign (sign)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(engagement::get))
        .route("/{id}/sign", post(engagement::sign))
}
