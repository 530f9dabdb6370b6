//! Handlers for client entities (`/accounts/{id}/entities`, `/entities/{id}`).
//!
//! Staff or admin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taxdesk_core::entity_types::{validate_entity_type, validate_tax_id_last4};
use taxdesk_core::error::CoreError;
use taxdesk_core::types::DbId;
use taxdesk_db::models::client_entity::{ClientEntity, CreateClientEntity, UpdateClientEntity};
use taxdesk_db::repositories::ClientEntityRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::accounts::ensure_account;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/accounts/{account_id}/entities
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(account_id): Path<DbId>,
    Json(input): Json<CreateClientEntity>,
) -> AppResult<(StatusCode, Json<DataResponse<ClientEntity>>)> {
    ensure_account(&state, account_id).await?;
    validate_fields(
        Some(&input.name),
        Some(&input.entity_type),
        input.tax_id_last4.as_deref(),
    )?;

    let entity = ClientEntityRepo::create(&state.pool, account_id, &input).await?;
    tracing::info!(
        client_entity_id = entity.id,
        account_id,
        entity_type = %entity.entity_type,
        user_id = user.user_id,
        "Client entity created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}

/// GET /api/v1/accounts/{account_id}/entities
pub async fn list_by_account(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(account_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ClientEntity>>>> {
    ensure_account(&state, account_id).await?;
    let entities = ClientEntityRepo::list_by_account(&state.pool, account_id).await?;
    Ok(Json(DataResponse { data: entities }))
}

/// GET /api/v1/entities/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClientEntity>>> {
    let entity = ensure_entity(&state, id).await?;
    Ok(Json(DataResponse { data: entity }))
}

/// PUT /api/v1/entities/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClientEntity>,
) -> AppResult<Json<DataResponse<ClientEntity>>> {
    validate_fields(
        input.name.as_deref(),
        input.entity_type.as_deref(),
        input.tax_id_last4.as_deref(),
    )?;
    let entity = ClientEntityRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("ClientEntity", id))?;
    Ok(Json(DataResponse { data: entity }))
}

/// DELETE /api/v1/entities/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ClientEntityRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(client_entity_id = id, user_id = user.user_id, "Client entity deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("ClientEntity", id))
    }
}

pub(crate) async fn ensure_entity(state: &AppState, id: DbId) -> AppResult<ClientEntity> {
    ClientEntityRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("ClientEntity", id))
}

fn validate_fields(
    name: Option<&str>,
    entity_type: Option<&str>,
    tax_id_last4: Option<&str>,
) -> AppResult<()> {
    let invalid = |msg: String| AppError::Core(CoreError::Validation(msg));

    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(invalid("Entity name must not be empty".into()));
    }
    if let Some(t) = entity_type {
        validate_entity_type(t).map_err(invalid)?;
    }
    if let Some(digits) = tax_id_last4 {
        validate_tax_id_last4(digits).map_err(invalid)?;
    }
    Ok(())
}
