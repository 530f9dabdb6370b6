//! Handlers for `/accounts` and account membership.
//!
//! Staff or admin only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use taxdesk_core::error::CoreError;
use taxdesk_core::roles::ROLE_CLIENT;
use taxdesk_core::types::DbId;
use taxdesk_db::models::account::{
    Account, AccountMember, AddAccountUser, CreateAccount, UpdateAccount,
};
use taxdesk_db::repositories::{clamp_limit, clamp_offset, AccountRepo, RoleRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::query::SearchParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/accounts
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Json(input): Json<CreateAccount>,
) -> AppResult<(StatusCode, Json<DataResponse<Account>>)> {
    validate_name(&input.name)?;
    let account = AccountRepo::create(&state.pool, &input).await?;
    tracing::info!(account_id = account.id, user_id = user.user_id, "Account created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: account })))
}

/// GET /api/v1/accounts?search=&limit=&offset=
pub async fn list(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<DataResponse<Vec<Account>>>> {
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let accounts = AccountRepo::list(
        &state.pool,
        search,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: accounts }))
}

/// GET /api/v1/accounts/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Account>>> {
    let account = AccountRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Account", id))?;
    Ok(Json(DataResponse { data: account }))
}

/// PUT /api/v1/accounts/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAccount>,
) -> AppResult<Json<DataResponse<Account>>> {
    if let Some(ref name) = input.name {
        validate_name(name)?;
    }
    let account = AccountRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Account", id))?;
    Ok(Json(DataResponse { data: account }))
}

/// DELETE /api/v1/accounts/{id}
///
/// Soft delete. The account's entities stay in place but drop out of lists.
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if AccountRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(account_id = id, user_id = user.user_id, "Account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Account", id))
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/accounts/{id}/users
pub async fn list_members(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AccountMember>>>> {
    ensure_account(&state, id).await?;
    let members = AccountRepo::list_members(&state.pool, id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/accounts/{id}/users
///
/// Add an existing client user. Access to entities is granted separately
/// through the ACL.
pub async fn add_member(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<AddAccountUser>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<AccountMember>>>)> {
    ensure_account(&state, id).await?;

    let member = UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or(AppError::not_found("User", input.user_id))?;
    let role = RoleRepo::resolve_name(&state.pool, member.role_id).await?;
    if role != ROLE_CLIENT {
        return Err(AppError::Core(CoreError::Validation(
            "Only client users can be account members".into(),
        )));
    }

    AccountRepo::add_member(&state.pool, id, &input).await?;
    tracing::info!(account_id = id, member_id = input.user_id, user_id = user.user_id, "Account member added");

    let members = AccountRepo::list_members(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: members })))
}

/// DELETE /api/v1/accounts/{id}/users/{user_id}
///
/// Also drops the user's ACL rows on the account's entities.
pub async fn remove_member(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path((id, member_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if AccountRepo::remove_member(&state.pool, id, member_id).await? {
        tracing::info!(account_id = id, member_id, user_id = user.user_id, "Account member removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("AccountMember", member_id))
    }
}

pub(crate) async fn ensure_account(state: &AppState, id: DbId) -> AppResult<Account> {
    AccountRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Account", id))
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Account name must not be empty".into(),
        )));
    }
    Ok(())
}
