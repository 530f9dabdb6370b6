pub mod accounts;
pub mod admin;
pub mod auth;
pub mod checklist;
pub mod client;
pub mod documents;
pub mod engagement;
pub mod entities;
pub mod health;
pub mod invites;
pub mod permissions;
pub mod questionnaire;
pub mod staff_roles;
pub mod tax_years;
pub mod threads;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         current user
///
/// /admin/users                                     list, create (admin only)
/// /admin/users/{id}                                get, update, deactivate
/// /admin/users/{id}/reset-password                 reset password
/// /staff-roles                                     list, create (admin only)
/// /staff-roles/{id}                                update, delete
/// /permissions/client/{account_id}/acl             get, replace (admin only)
///
/// /accounts                                        list, create (staff)
/// /accounts/{id}                                   get, update, delete
/// /accounts/{id}/users                             list, add members
/// /accounts/{id}/users/{user_id}                   remove member
/// /accounts/{id}/entities                          list, create entities
/// /entities/{id}                                   get, update, delete
/// /entities/{id}/tax-years                         list, create tax years
///
/// /tax-years/{id}                                  get, update (staff)
/// /tax-years/{id}/status                           staff transition (PUT)
/// /tax-years/{id}/signers                          list, replace (staff)
/// /tax-years/{id}/activity                         activity log (staff)
/// /tax-years/{id}/checklist                        list (view), create (staff)
/// /tax-years/{id}/documents                        list (view)
/// /tax-years/{id}/documents/confirm                confirm documents (POST)
/// /tax-years/{id}/efile/sign                       e-file authorization (POST)
/// /tax-years/{id}/extension                        extension request (POST)
/// /checklist/{id}                                  update, delete (staff)
/// /checklist/{id}/not-applicable                   toggle (upload)
///
/// /client/tax-years                                tax years with stage views
/// /client/tax-years/{id}/status                    full status for one year
/// /engagement/{tax_year_id}                        signers and signatures
/// /engagement/{tax_year_id}/sign                   sign (POST)
/// /documents/upload                                multipart upload (POST)
/// /documents/{id}                                  soft delete
/// /documents/{id}/download                         file download
/// /questionnaire/questions                         list (staff), create (admin)
/// /questionnaire/questions/{id}                    update, deactivate (admin)
/// /questionnaire/{tax_year_id}                     questions and answers
/// /questionnaire/{tax_year_id}/answer              answer (POST)
/// /threads/{tax_year_id}/messages                  poll (after_id), post
///
/// /invites                                         queue invite (staff)
/// /invites/queue                                   pending invites (staff)
/// /invites/accept                                  accept (public)
/// /invites/{id}                                    get (staff)
/// /invites/{id}/revoke                             revoke (POST)
/// /invites/{id}/resend                             requeue (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication (login, refresh, logout, me).
        .nest("/auth", auth::router())
        // Admin: users, staff roles, client ACLs.
        .nest("/admin", admin::router())
        .nest("/staff-roles", staff_roles::router())
        .nest("/permissions", permissions::router())
        // Firm-side client records.
        .nest("/accounts", accounts::router())
        .nest("/entities", entities::router())
        .nest("/tax-years", tax_years::router())
        .nest("/checklist", checklist::router())
        // Client-facing workflow.
        .nest("/client", client::router())
        .nest("/engagement", engagement::router())
        .nest("/documents", documents::router())
        .nest("/questionnaire", questionnaire::router())
        .nest("/threads", threads::router())
        // Invitations.
        .nest("/invites", invites::router())
}
