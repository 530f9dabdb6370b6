//! Handlers for entity tax years, their stage and engagement signers.
//!
//! Staff or admin only. Client-facing views live in
//! [`client`](super::client).

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use taxdesk_core::engagement::EngagementStatus;
use taxdesk_core::entity_types::validate_tax_year;
use taxdesk_core::error::CoreError;
use taxdesk_core::roles::is_firm_role;
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::{check_staff_transition, InternalStatus};
use taxdesk_db::models::activity_event::ActivityEvent;
use taxdesk_db::models::engagement::EngagementSigner;
use taxdesk_db::models::tax_year::{CreateTaxYear, EntityTaxYear, UpdateTaxYear};
use taxdesk_db::repositories::{
    clamp_limit, clamp_offset, AccountRepo, ActivityEventRepo, EngagementRepo, MessageRepo,
    RoleRepo, TaxYearRepo, UserRepo,
};
use taxdesk_events::bus::SOURCE_TAX_YEAR;

use crate::error::{AppError, AppResult};
use crate::handlers::entities::ensure_entity;
use crate::middleware::rbac::RequireStaff;
use crate::progress::{self, StatusMove};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// A tax year with its decoded stage and engagement status.
#[derive(Debug, Serialize)]
pub struct TaxYearDetail {
    #[serde(flatten)]
    pub tax_year: EntityTaxYear,
    pub status: InternalStatus,
    pub engagement_status: EngagementStatus,
}

impl TaxYearDetail {
    pub(crate) fn new(tax_year: EntityTaxYear) -> AppResult<Self> {
        Ok(Self {
            status: tax_year.status()?,
            engagement_status: tax_year.engagement_status()?,
            tax_year,
        })
    }
}

/// Request body for `PUT /tax-years/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Stage code, e.g. `"SIGN_EFILE"`.
    pub status: String,
}

/// Request body for `PUT /tax-years/{id}/signers`.
#[derive(Debug, Deserialize)]
pub struct SetSignersRequest {
    pub user_ids: Vec<DbId>,
}

/// POST /api/v1/entities/{entity_id}/tax-years
///
/// New tax years start at `SIGN_ENGAGEMENT` with an empty message thread.
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(entity_id): Path<DbId>,
    Json(input): Json<CreateTaxYear>,
) -> AppResult<(StatusCode, Json<DataResponse<TaxYearDetail>>)> {
    ensure_entity(&state, entity_id).await?;
    validate_tax_year(input.tax_year).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    if let Some(staff_id) = input.assigned_staff_id {
        check_assignee(&state, staff_id).await?;
    }

    let year = TaxYearRepo::create(&state.pool, entity_id, &input).await?;
    MessageRepo::get_or_create_thread(&state.pool, year.id).await?;

    tracing::info!(
        tax_year_id = year.id,
        client_entity_id = entity_id,
        tax_year = year.tax_year,
        user_id = user.user_id,
        "Tax year created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: TaxYearDetail::new(year)? })))
}

/// GET /api/v1/entities/{entity_id}/tax-years
pub async fn list_by_entity(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(entity_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<TaxYearDetail>>>> {
    ensure_entity(&state, entity_id).await?;
    let years = TaxYearRepo::list_by_entity(&state.pool, entity_id)
        .await?
        .into_iter()
        .map(TaxYearDetail::new)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data: years }))
}

/// GET /api/v1/tax-years/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    let year = ensure_tax_year(&state, id).await?;
    Ok(Json(DataResponse { data: TaxYearDetail::new(year)? }))
}

/// PUT /api/v1/tax-years/{id}
///
/// Reassigns the responsible staff member (or clears it with `null`).
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTaxYear>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    ensure_tax_year(&state, id).await?;
    if let Some(staff_id) = input.assigned_staff_id {
        check_assignee(&state, staff_id).await?;
    }

    let year = TaxYearRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("TaxYear", id))?;
    tracing::info!(
        tax_year_id = id,
        assigned_staff_id = ?input.assigned_staff_id,
        user_id = user.user_id,
        "Tax year reassigned"
    );
    Ok(Json(DataResponse { data: TaxYearDetail::new(year)? }))
}

/// PUT /api/v1/tax-years/{id}/status
///
/// Staff transition: advance one firm-driven stage or reopen to any earlier
/// stage. Reopening clears the milestones recorded at or after the target.
pub async fn set_status(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<SetStatusRequest>,
) -> AppResult<Json<DataResponse<TaxYearDetail>>> {
    let to = InternalStatus::from_code(input.status.trim()).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown status '{}'",
            input.status
        )))
    })?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, id).await?;
    let from = year.status()?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    check_staff_transition(from, to, &facts)?;

    if to < from {
        TaxYearRepo::reset_for_reopen(&mut tx, id, to).await?;
        TaxYearRepo::set_status(&mut tx, id, to).await?;
    } else if to == InternalStatus::Filed {
        TaxYearRepo::mark_filed(&mut tx, id).await?;
    } else {
        TaxYearRepo::set_status(&mut tx, id, to).await?;
    }
    tx.commit().await?;

    progress::publish_moves(&state.event_bus, id, user.user_id, &[StatusMove { from, to }]);

    let year = ensure_tax_year(&state, id).await?;
    Ok(Json(DataResponse { data: TaxYearDetail::new(year)? }))
}

/// GET /api/v1/tax-years/{id}/activity?limit=&offset=
pub async fn list_activity(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ActivityEvent>>>> {
    ensure_tax_year(&state, id).await?;
    let events = ActivityEventRepo::list_for_source(
        &state.pool,
        SOURCE_TAX_YEAR,
        id,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: events }))
}

// ---------------------------------------------------------------------------
// Engagement signers
// ---------------------------------------------------------------------------

/// GET /api/v1/tax-years/{id}/signers
pub async fn list_signers(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EngagementSigner>>>> {
    ensure_tax_year(&state, id).await?;
    let signers = EngagementRepo::list_signers(&state.pool, id).await?;
    Ok(Json(DataResponse { data: signers }))
}

/// PUT /api/v1/tax-years/{id}/signers
///
/// Replace the required signers. Each must be a member of the entity's
/// account. Only open while the engagement letter is being signed.
pub async fn replace_signers(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<SetSignersRequest>,
) -> AppResult<Json<DataResponse<Vec<EngagementSigner>>>> {
    let with_entity = TaxYearRepo::find_with_entity(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("TaxYear", id))?;

    let mut seen = HashSet::new();
    for &signer_id in &input.user_ids {
        if !seen.insert(signer_id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {signer_id} is listed more than once"
            ))));
        }
        if !AccountRepo::is_member(&state.pool, with_entity.account_id, signer_id).await? {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {signer_id} is not a member of account {}",
                with_entity.account_id
            ))));
        }
    }

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, id).await?;
    if year.status()? != InternalStatus::SignEngagement {
        return Err(AppError::Core(CoreError::Conflict(
            "Signers can only be changed while the engagement letter is open; \
             reopen the tax year first"
                .into(),
        )));
    }
    EngagementRepo::replace_signers_in_tx(&mut tx, id, &input.user_ids).await?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    let moves = progress::sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;

    tracing::info!(
        tax_year_id = id,
        signers = input.user_ids.len(),
        engagement = ?facts.engagement,
        user_id = user.user_id,
        "Engagement signers replaced"
    );
    progress::publish_moves(&state.event_bus, id, user.user_id, &moves);

    let signers = EngagementRepo::list_signers(&state.pool, id).await?;
    Ok(Json(DataResponse { data: signers }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn ensure_tax_year(state: &AppState, id: DbId) -> AppResult<EntityTaxYear> {
    TaxYearRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("TaxYear", id))
}

/// The assignee must be an active firm user.
async fn check_assignee(state: &AppState, staff_id: DbId) -> AppResult<()> {
    let staff = UserRepo::find_by_id(&state.pool, staff_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::not_found("User", staff_id))?;
    let role = RoleRepo::resolve_name(&state.pool, staff.role_id).await?;
    if !is_firm_role(&role) {
        return Err(AppError::Core(CoreError::Validation(
            "Tax years can only be assigned to staff or admin users".into(),
        )));
    }
    Ok(())
}
