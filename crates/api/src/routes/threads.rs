//! Route definitions for `/threads`.

use axum::routing::get;
use axum::Router;

use crate::handlers::messages;
use crate::state::AppState;

/// Routes mounted at `/threads`.
///
/// ```text
/// GET  /{tax_year_id}/messages?after_id=&limit=   -> list (message)
/// POST /{tax_year_id}/messages                    -> post (message)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{tax_year_id}/messages",
        get(messages::list).post(messages::post),
    )
}
