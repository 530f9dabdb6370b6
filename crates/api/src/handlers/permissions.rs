//! Handlers for `/permissions/client/{account_id}/acl`.
//!
//! The ACL editor works on a whole account at once: every member user
//! against every live entity of the account. Admin only.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use taxdesk_core::error::CoreError;
use taxdesk_core::permissions::{normalize_permissions, validate_permissions, ALL_PERMISSIONS};
use taxdesk_core::types::DbId;
use taxdesk_db::models::account::AccountMember;
use taxdesk_db::models::client_entity::ClientEntity;
use taxdesk_db::models::permission::{AclEntry, EntityPermission};
use taxdesk_db::repositories::{AccountRepo, ClientEntityRepo, PermissionRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// The ACL grid for one account.
#[derive(Debug, Serialize)]
pub struct AccountAcl {
    pub account_id: DbId,
    /// Every flag the editor can offer.
    pub available_permissions: &'static [&'static str],
    pub members: Vec<AccountMember>,
    pub entities: Vec<ClientEntity>,
    pub entries: Vec<EntityPermission>,
}

/// Request body for `PUT /permissions/client/{account_id}/acl`.
#[derive(Debug, Deserialize)]
pub struct ReplaceAclRequest {
    pub entries: Vec<AclEntry>,
}

/// GET /api/v1/permissions/client/{account_id}/acl
pub async fn get_acl(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(account_id): Path<DbId>,
) -> AppResult<Json<DataResponse<AccountAcl>>> {
    let acl = load_acl(&state, account_id).await?;
    Ok(Json(DataResponse { data: acl }))
}

/// PUT /api/v1/permissions/client/{account_id}/acl
///
/// Replace every ACL row of the account. Entries with no flags revoke
/// access; any flag implies `view`.
pub async fn replace_acl(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(account_id): Path<DbId>,
    Json(input): Json<ReplaceAclRequest>,
) -> AppResult<Json<DataResponse<AccountAcl>>> {
    AccountRepo::find_by_id(&state.pool, account_id)
        .await?
        .ok_or(AppError::not_found("Account", account_id))?;

    let member_ids: HashSet<DbId> = AccountRepo::list_members(&state.pool, account_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    let entity_ids: HashSet<DbId> = ClientEntityRepo::list_by_account(&state.pool, account_id)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(input.entries.len());
    for entry in input.entries {
        if !member_ids.contains(&entry.user_id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {} is not a member of account {account_id}",
                entry.user_id
            ))));
        }
        if !entity_ids.contains(&entry.client_entity_id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Entity {} does not belong to account {account_id}",
                entry.client_entity_id
            ))));
        }
        if !seen.insert((entry.user_id, entry.client_entity_id)) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Duplicate ACL entry for user {} on entity {}",
                entry.user_id, entry.client_entity_id
            ))));
        }
        validate_permissions(&entry.permissions)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

        entries.push(AclEntry {
            permissions: normalize_permissions(&entry.permissions),
            ..entry
        });
    }

    let mut tx = state.pool.begin().await?;
    PermissionRepo::replace_for_account_in_tx(&mut tx, account_id, &entries).await?;
    tx.commit().await?;

    tracing::info!(
        account_id,
        entries = entries.len(),
        admin_id = admin.user_id,
        "Account ACL replaced"
    );

    let acl = load_acl(&state, account_id).await?;
    Ok(Json(DataResponse { data: acl }))
}

async fn load_acl(state: &AppState, account_id: DbId) -> AppResult<AccountAcl> {
    AccountRepo::find_by_id(&state.pool, account_id)
        .await?
        .ok_or(AppError::not_found("Account", account_id))?;

    Ok(AccountAcl {
        account_id,
        available_permissions: ALL_PERMISSIONS,
        members: AccountRepo::list_members(&state.pool, account_id).await?,
        entities: ClientEntityRepo::list_by_account(&state.pool, account_id).await?,
        entries: PermissionRepo::list_for_account(&state.pool, account_id).await?,
    })
}
