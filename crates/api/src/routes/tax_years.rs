//! Route definitions for `/tax-years`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{checklist, documents, milestones, tax_years};
use crate::state::AppState;

/// Routes mounted at `/tax-years`.
///
/// Staff-only routes are enforced by `RequireStaff`; the rest are
/// ACL-checked per entity.
///
/// ```text
/// GET  /{id}                      -> get_by_id (staff)
/// PUT  /{id}                      -> update (staff)
/// PUT  /{id}/status               -> set_status (staff)
/// GET  /{id}/signers              -> list_signers (staff)
/// PUT  /{id}/signers              -> replace_signers (staff)
/// GET  /{id}/activity             -> list_activity (staff)
/// GET  /{id}/checklist            -> checklist::list (view)
/// POST /{id}/checklist            -> checklist::create (staff)
/// GET  /{id}/documents            -> documents::list_by_tax_year (view)
/// POST /{id}/documents/confirm    -> milestones::confirm_documents (upload)
/// POST /{id}/efile/sign           -> milestones::sign_efile (sign)
/// POST /{id}/extension            -> milestones::request_extension (view)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(tax_years::get_by_id).put(tax_years::update))
        .route("/{id}/status", put(tax_years::set_status))
        .route(
            "/{id}/signers",
            get(tax_years::list_signers).put(tax_years::replace_signers),
        )
        .route("/{id}/activity", get(tax_years::list_activity))
        .route("/{id}/checklist", get(checklist::list).post(checklist::create))
        .route("/{id}/documents", get(documents::list_by_tax_year))
        .route("/{id}/documents/confirm", post(milestones::confirm_documents))
        .route("/{id}/efile/sign", post(milestones::sign_efile))
        .route("/{id}/extension", post(milestones::request_extension))
}
