//! Handlers for the `/admin` resource (user management).
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use taxdesk_core::error::CoreError;
use taxdesk_core::invites::{normalize_email, validate_email};
use taxdesk_core::roles::is_firm_role;
use taxdesk_core::types::DbId;
use taxdesk_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use taxdesk_db::repositories::{RoleRepo, SessionRepo, UserRepo};

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum password length enforced on user creation and password reset.
pub const MIN_PASSWORD_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: DbId,
    pub staff_role_id: Option<DbId>,
}

/// Request body for `PUT /admin/users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_id: Option<DbId>,
    pub staff_role_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /admin/users/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// `?role=` filter for `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users
///
/// Create a new user. Validates password strength, hashes it, and returns
/// a safe [`UserResponse`] with 201 Created.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let email = normalize_email(&input.email);
    validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_names(&input.first_name, &input.last_name)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    check_staff_role(&state, input.role_id, input.staff_role_id).await?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateUser {
        email,
        password_hash: hashed,
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        role_id: input.role_id,
        staff_role_id: input.staff_role_id,
    };

    let user = UserRepo::create(&state.pool, &create_dto).await?;
    tracing::info!(user_id = user.id, role_id = user.role_id, admin_id = admin.user_id, "User created");

    let response = user_to_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/admin/users
///
/// List users with resolved role names, optionally filtered by role name.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ListUsersParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    // Pre-fetch all roles to avoid N+1 queries.
    let roles = RoleRepo::list(&state.pool).await?;

    let users = match params.role.as_deref() {
        Some(name) => {
            let role = roles.iter().find(|r| r.name == name).ok_or_else(|| {
                AppError::BadRequest(format!("Unknown role '{name}'"))
            })?;
            UserRepo::list_by_role(&state.pool, role.id).await?
        }
        None => UserRepo::list(&state.pool).await?,
    };

    let responses: Vec<UserResponse> = users
        .iter()
        .map(|u| {
            let role_name = roles
                .iter()
                .find(|r| r.id == u.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            UserResponse::from_user(u, role_name)
        })
        .collect();

    Ok(Json(DataResponse { data: responses }))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("User", id))?;

    let response = user_to_response(&state, &user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// PUT /api/v1/admin/users/{id}
///
/// Update a user's profile fields (not password).
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let existing = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("User", id))?;

    let email = match input.email {
        Some(ref raw) => {
            let email = normalize_email(raw);
            validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            Some(email)
        }
        None => None,
    };
    if input.first_name.is_some() || input.last_name.is_some() {
        validate_names(
            input.first_name.as_deref().unwrap_or(&existing.first_name),
            input.last_name.as_deref().unwrap_or(&existing.last_name),
        )?;
    }
    if input.role_id.is_some() || input.staff_role_id.is_some() {
        check_staff_role(
            &state,
            input.role_id.unwrap_or(existing.role_id),
            input.staff_role_id.or(existing.staff_role_id),
        )
        .await?;
    }
    if id == admin.user_id && input.is_active == Some(false) {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot deactivate themselves".into(),
        )));
    }

    let update_dto = UpdateUser {
        email,
        first_name: input.first_name.map(|s| s.trim().to_string()),
        last_name: input.last_name.map(|s| s.trim().to_string()),
        role_id: input.role_id,
        staff_role_id: input.staff_role_id,
        is_active: input.is_active,
    };

    let user = UserRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::not_found("User", id))?;
    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }
    tracing::info!(user_id = id, admin_id = admin.user_id, "User updated");

    let response = user_to_response(&state, &user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft-deactivate a user and revoke their sessions. Returns 204 No Content.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot deactivate themselves".into(),
        )));
    }
    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if deactivated {
        let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;
        tracing::info!(user_id = id, admin_id = admin.user_id, revoked, "User deactivated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("User", id))
    }
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Admin-initiated password reset. Existing sessions are revoked.
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let updated = UserRepo::update_password(&state.pool, id, &hashed).await?;
    if !updated {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, admin_id = admin.user_id, "Password reset by admin");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a [`User`] row into a safe [`UserResponse`] by resolving the role name.
async fn user_to_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(UserResponse::from_user(user, role_name))
}

pub(crate) fn validate_names(first_name: &str, last_name: &str) -> AppResult<()> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "First and last name must not be empty".into(),
        )));
    }
    Ok(())
}

/// Staff titles only apply to firm users.
async fn check_staff_role(
    state: &AppState,
    role_id: DbId,
    staff_role_id: Option<DbId>,
) -> AppResult<()> {
    let role = RoleRepo::find_by_id(&state.pool, role_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown role id {role_id}")))?;
    if staff_role_id.is_some() && !is_firm_role(&role.name) {
        return Err(AppError::Core(CoreError::Validation(
            "Only staff and admin users can hold a staff role".into(),
        )));
    }
    Ok(())
}
