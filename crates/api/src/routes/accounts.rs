//! Route definitions for `/accounts`.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::{accounts, entities};
use crate::state::AppState;

/// Routes mounted at `/accounts`. Staff or admin.
///
/// ```text
/// GET    /                         -> list
/// POST   /                         -> create
/// GET    /{id}                     -> get_by_id
/// PUT    /{id}                     -> update
/// DELETE /{id}                     -> delete
/// GET    /{id}/users               -> list_members
/// POST   /{id}/users               -> add_member
/// DELETE /{id}/users/{user_id}     -> remove_member
/// GET    /{id}/entities            -> entities::list_by_account
/// POST   /{id}/entities            -> entities::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(accounts::list).post(accounts::create))
        .route(
            "/{id}",
            get(accounts::get_by_id)
                .put(accounts::update)
                .delete(accounts::delete),
        )
        .route(
            "/{id}/users",
            get(accounts::list_members).post(accounts::add_member),
        )
        .route("/{id}/users/{user_id}", delete(accounts::remove_member))
        .route(
            "/{id}/entities",
            get(entities::list_by_account).post(entities::create),
        )
}
