//! Route definitions for `/client`.

use axum::routing::get;
use axum::Router;

use crate::handlers::client;
use crate::state::AppState;

/// Routes mounted at `/client`.
///
/// ```text
/// GET /tax-years               -> list
/// GET /tax-years/{id}/status   -> status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tax-years", get(client::list))
        .route("/tax-years/{id}/status", get(client::status))
}
