//! Handlers for `/staff-roles`: firm job titles assigned to staff users.
//!
//! Admin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taxdesk_core::error::CoreError;
use taxdesk_core::types::DbId;
use taxdesk_db::models::staff_role::{CreateStaffRole, StaffRole, UpdateStaffRole};
use taxdesk_db::repositories::StaffRoleRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/staff-roles
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<StaffRole>>>> {
    let roles = StaffRoleRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: roles }))
}

/// POST /api/v1/staff-roles
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateStaffRole>,
) -> AppResult<(StatusCode, Json<DataResponse<StaffRole>>)> {
    validate_name(&input.name)?;
    let role = StaffRoleRepo::create(&state.pool, &input).await?;
    tracing::info!(staff_role_id = role.id, admin_id = admin.user_id, "Staff role created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: role })))
}

/// PUT /api/v1/staff-roles/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStaffRole>,
) -> AppResult<Json<DataResponse<StaffRole>>> {
    if let Some(ref name) = input.name {
        validate_name(name)?;
    }
    let role = StaffRoleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("StaffRole", id))?;
    Ok(Json(DataResponse { data: role }))
}

/// DELETE /api/v1/staff-roles/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if StaffRoleRepo::delete(&state.pool, id).await? {
        tracing::info!(staff_role_id = id, admin_id = admin.user_id, "Staff role deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("StaffRole", id))
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Staff role name must not be empty".into(),
        )));
    }
    Ok(())
}
