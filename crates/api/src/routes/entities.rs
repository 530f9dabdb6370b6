//! Route definitions for `/entities`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{entities, tax_years};
use crate::state::AppState;

/// Routes mounted at `/entities`. Staff or admin.
///
/// ```text
/// GET    /{id}             -> get_by_id
/// PUT    /{id}             -> update
/// DELETE /{id}             -> delete
/// GET    /{id}/tax-years   -> tax_years::list_by_entity
/// POST   /{id}/tax-years   -> tax_years::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(entities::get_by_id)
                .put(entities::update)
                .delete(entities::delete),
        )
        .route(
            "/{id}/tax-years",
            get(tax_years::list_by_entity).post(tax_years::create),
        )
}
