//! Client milestones on a tax year: confirming documents, signing the
//! e-file authorization and requesting an extension.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use taxdesk_core::engagement::validate_signature_name;
use taxdesk_core::permissions::{PERM_SIGN, PERM_UPLOAD, PERM_VIEW};
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::{
    check_client_transition, check_efile_authorization, check_extension_request, InternalStatus,
};
use taxdesk_db::repositories::TaxYearRepo;
use taxdesk_events::bus::{
    EVENT_DOCUMENTS_CONFIRMED, EVENT_EFILE_AUTHORIZED, EVENT_EXTENSION_REQUESTED,
};
use taxdesk_events::DomainEvent;

use crate::access::authorize_tax_year;
use crate::error::AppResult;
use crate::handlers::tax_years::{ensure_tax_year, TaxYearDetail};
use crate::middleware::auth::AuthUser;
use crate::progress::{self, StatusMove};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /tax-years/{id}/efile/sign`.
#[derive(Debug, Deserialize)]
pub struct EfileSignRequest {
    pub signature_name: String,
}

/// POST /api/v1/tax-years/{id}/documents/confirm
///
/// Moves `CONFIRM_DOCUMENTS` to `IN_REVIEW`. Requires `upload`.
pub async fn confirm_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    authorize_tax_year(&state.pool, &user, id, PERM_UPLOAD).await?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, id).await?;
    let from = year.status()?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    check_client_transition(from, InternalStatus::InReview, &facts)?;

    TaxYearRepo::mark_documents_confirmed(&mut tx, id).await?;
    TaxYearRepo::set_status(&mut tx, id, InternalStatus::InReview).await?;
    tx.commit().await?;

    tracing::info!(tax_year_id = id, user_id = user.user_id, "Documents confirmed");
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_DOCUMENTS_CONFIRMED, id).with_actor(user.user_id),
    );
    progress::publish_moves(
        &state.event_bus,
        id,
        user.user_id,
        &[StatusMove {
            from,
            to: InternalStatus::InReview,
        }],
    );

    detail(&state, id).await
}

/// POST /api/v1/tax-years/{id}/efile/sign
///
/// Records the e-file authorization. The stage stays at `SIGN_EFILE` until
/// staff file the return. Requires `sign`.
pub async fn sign_efile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<EfileSignRequest>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    authorize_tax_year(&state.pool, &user, id, PERM_SIGN).await?;
    let signature_name = validate_signature_name(&input.signature_name)?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, id).await?;
    check_efile_authorization(year.status()?, year.efile_authorized_at.is_some())?;
    TaxYearRepo::authorize_efile(&mut tx, id, user.user_id, &signature_name).await?;
    tx.commit().await?;

    tracing::info!(tax_year_id = id, user_id = user.user_id, "E-file authorization signed");
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_EFILE_AUTHORIZED, id)
            .with_actor(user.user_id)
            .with_payload(json!({ "signature_name": signature_name })),
    );

    detail(&state, id).await
}

/// POST /api/v1/tax-years/{id}/extension
///
/// Any stage before `FILED`, once. Requires only `view`.
pub async fn request_extension(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    authorize_tax_year(&state.pool, &user, id, PERM_VIEW).await?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, id).await?;
    check_extension_request(year.status()?, year.extension_requested_at.is_some())?;
    TaxYearRepo::request_extension(&mut tx, id, user.user_id).await?;
    tx.commit().await?;

    tracing::info!(tax_year_id = id, user_id = user.user_id, "Extension requested");
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_EXTENSION_REQUESTED, id).with_actor(user.user_id),
    );

    detail(&state, id).await
}

async fn detail(state: &AppState, id: DbId) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    let year = ensure_tax_year(state, id).await?;
    Ok(Json(DataResponse {
        data: TaxYearDetail::new(year)?,
    }))
}
