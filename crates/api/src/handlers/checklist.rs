//! Handlers for a tax year's document checklist.
//!
//! Staff define the items; clients see them with document counts and may
//! mark an item not applicable. Every change that can affect the
//! required-items fact re-syncs the tax year's stage.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use taxdesk_core::error::CoreError;
use taxdesk_core::permissions::{PERM_UPLOAD, PERM_VIEW};
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::InternalStatus;
use taxdesk_db::models::checklist::{
    ChecklistItem, ChecklistItemWithCount, CreateChecklistItem, UpdateChecklistItem,
};
use taxdesk_db::repositories::ChecklistRepo;

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::handlers::tax_years::ensure_tax_year;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::progress;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /checklist/{id}/not-applicable`.
#[derive(Debug, Deserialize)]
pub struct NotApplicableRequest {
    pub not_applicable: bool,
}

/// GET /api/v1/tax-years/{id}/checklist
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChecklistItemWithCount>>>> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_VIEW).await?;
    let items = ChecklistRepo::list_with_counts(&state.pool, tax_year_id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/tax-years/{id}/checklist
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(tax_year_id): Path<DbId>,
    Json(input): Json<CreateChecklistItem>,
) -> AppResult<(StatusCode, Json<DataResponse<ChecklistItem>>)> {
    ensure_tax_year(&state, tax_year_id).await?;
    validate_label(&input.label)?;

    let item = ChecklistRepo::create(&state.pool, tax_year_id, &input).await?;
    tracing::info!(
        checklist_item_id = item.id,
        tax_year_id,
        is_required = item.is_required,
        user_id = user.user_id,
        "Checklist item created"
    );
    progress::resync(&state.pool, &state.event_bus, tax_year_id, user.user_id).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/checklist/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateChecklistItem>,
) -> AppResult<Json<DataResponse<ChecklistItem>>> {
    if let Some(ref label) = input.label {
        validate_label(label)?;
    }

    let item = ChecklistRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("ChecklistItem", id))?;
    progress::resync(&state.pool, &state.event_bus, item.entity_tax_year_id, user.user_id).await?;

    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/checklist/{id}
///
/// Documents filed under the item stay on the tax year, unassigned.
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let item = ChecklistRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("ChecklistItem", id))?;

    if !ChecklistRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("ChecklistItem", id));
    }
    tracing::info!(
        checklist_item_id = id,
        tax_year_id = item.entity_tax_year_id,
        user_id = user.user_id,
        "Checklist item deleted"
    );
    progress::resync(&state.pool, &state.event_bus, item.entity_tax_year_id, user.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/checklist/{id}/not-applicable
///
/// Toggle the not-applicable flag. Requires `upload`; closed once the
/// documents have been confirmed.
pub async fn set_not_applicable(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<NotApplicableRequest>,
) -> AppResult<Json<DataResponse<ChecklistItem>>> {
    let existing = ChecklistRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("ChecklistItem", id))?;
    let tax_year_id = existing.entity_tax_year_id;
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_UPLOAD).await?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, tax_year_id).await?;
    if !user.is_firm() && year.status()? > InternalStatus::ConfirmDocuments {
        return Err(AppError::Core(CoreError::Conflict(
            "The checklist is closed once documents are confirmed".into(),
        )));
    }

    let item = ChecklistRepo::set_not_applicable_in_tx(&mut tx, id, input.not_applicable)
        .await?
        .ok_or(AppError::not_found("ChecklistItem", id))?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    let moves = progress::sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;

    tracing::info!(
        checklist_item_id = id,
        tax_year_id,
        not_applicable = input.not_applicable,
        user_id = user.user_id,
        "Checklist item applicability changed"
    );
    progress::publish_moves(&state.event_bus, tax_year_id, user.user_id, &moves);

    Ok(Json(DataResponse { data: item }))
}

fn validate_label(label: &str) -> AppResult<()> {
    if label.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Checklist label must not be empty".into(),
        )));
    }
    Ok(())
}
