//! Handlers for client invitations.
//!
//! Staff queue invites; the background
//! [`InviteDispatcher`](taxdesk_events::InviteDispatcher) issues the real
//! token when it sends the email. Until then the row carries a random
//! placeholder hash that no one holds the plaintext for.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use taxdesk_core::error::CoreError;
use taxdesk_core::hashing::sha256_hex;
use taxdesk_core::invites::{
    can_accept, can_revoke, is_expired, normalize_email, validate_email,
    DEFAULT_INVITE_LIFETIME_DAYS,
};
use taxdesk_core::permissions::{normalize_permissions, validate_permissions};
use taxdesk_core::roles::ROLE_CLIENT;
use taxdesk_core::types::DbId;
use taxdesk_db::models::invite::{CreateInvite, CreateInviteRequest, Invite};
use taxdesk_db::models::user::{CreateUser, User};
use taxdesk_db::repositories::{
    clamp_limit, clamp_offset, AccountRepo, ClientEntityRepo, InviteRepo, PermissionRepo,
    RoleRepo, UserRepo,
};
use taxdesk_events::bus::{EVENT_INVITE_ACCEPTED, EVENT_INVITE_QUEUED, SOURCE_INVITE};
use taxdesk_events::{issue_invite_token, DomainEvent};

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::accounts::ensure_account;
use crate::handlers::admin::{validate_names, MIN_PASSWORD_LENGTH};
use crate::handlers::auth::{create_auth_response, AuthResponse};
use crate::middleware::rbac::RequireStaff;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /invites/accept`.
#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// POST /api/v1/invites
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Json(input): Json<CreateInviteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Invite>>)> {
    ensure_account(&state, input.account_id).await?;

    let email = normalize_email(&input.email);
    validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_permissions(&input.permissions)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let (_, placeholder_hash) = issue_invite_token();
    let invite = InviteRepo::create(
        &state.pool,
        &CreateInvite {
            account_id: input.account_id,
            email,
            first_name: trimmed(input.first_name),
            last_name: trimmed(input.last_name),
            permissions: normalize_permissions(&input.permissions),
            token_hash: placeholder_hash,
            invited_by: Some(user.user_id),
            expires_at: Utc::now() + Duration::days(DEFAULT_INVITE_LIFETIME_DAYS),
        },
    )
    .await?;

    tracing::info!(
        invite_id = invite.id,
        account_id = invite.account_id,
        user_id = user.user_id,
        "Invite queued"
    );
    state.event_bus.publish(
        DomainEvent::new(EVENT_INVITE_QUEUED)
            .with_source(SOURCE_INVITE, invite.id)
            .with_actor(user.user_id)
            .with_payload(json!({ "account_id": invite.account_id })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: invite })))
}

/// GET /api/v1/invites/queue?limit=&offset=
///
/// Queued and sent invites, newest first.
pub async fn list_pending(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Invite>>>> {
    let invites = InviteRepo::list_pending(
        &state.pool,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: invites }))
}

/// GET /api/v1/invites/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invite>>> {
    let invite = find_invite(&state, id).await?;
    Ok(Json(DataResponse { data: invite }))
}

/// POST /api/v1/invites/{id}/revoke
pub async fn revoke(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invite>>> {
    let existing = find_invite(&state, id).await?;
    if !can_revoke(&existing.status) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "An invite that is {} cannot be revoked",
            existing.status
        ))));
    }

    let invite = InviteRepo::revoke(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::Conflict("The invite changed state; reload it".into()))
    })?;
    tracing::info!(invite_id = id, user_id = user.user_id, "Invite revoked");
    Ok(Json(DataResponse { data: invite }))
}

/// POST /api/v1/invites/{id}/resend
///
/// Put a pending invite back on the queue with a fresh expiry. The link in
/// any earlier email stops working.
pub async fn resend(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invite>>> {
    let existing = find_invite(&state, id).await?;
    if !can_revoke(&existing.status) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "An invite that is {} cannot be resent",
            existing.status
        ))));
    }

    let (_, placeholder_hash) = issue_invite_token();
    let expires_at = Utc::now() + Duration::days(DEFAULT_INVITE_LIFETIME_DAYS);
    let invite = InviteRepo::requeue(&state.pool, id, &placeholder_hash, expires_at)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict("The invite changed state; reload it".into()))
        })?;

    tracing::info!(invite_id = id, user_id = user.user_id, "Invite requeued");
    state.event_bus.publish(
        DomainEvent::new(EVENT_INVITE_QUEUED)
            .with_source(SOURCE_INVITE, id)
            .with_actor(user.user_id)
            .with_payload(json!({ "account_id": invite.account_id, "resend": true })),
    );
    Ok(Json(DataResponse { data: invite }))
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// POST /api/v1/invites/accept
///
/// Public. Creates the client user, or links an existing client user with
/// the same email (who must then give their current password). Adds the
/// account membership and grants the invite's permissions on every entity
/// of the account. Returns tokens for the new session.
pub async fn accept(
    State(state): State<AppState>,
    Json(input): Json<AcceptInviteRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = input.token.trim();
    if token.is_empty() {
        return Err(invalid_token());
    }

    let mut tx = state.pool.begin().await?;
    let invite = InviteRepo::lock_by_token_hash_in_tx(&mut tx, &sha256_hex(token.as_bytes()))
        .await?
        .ok_or_else(invalid_token)?;
    if !can_accept(&invite.status) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "This invite is {} and can no longer be accepted",
            invite.status
        ))));
    }
    if is_expired(invite.expires_at, Utc::now()) {
        return Err(AppError::Core(CoreError::Conflict(
            "This invite has expired; ask the firm to resend it".into(),
        )));
    }
    if AccountRepo::find_by_id(&state.pool, invite.account_id).await?.is_none() {
        return Err(AppError::Core(CoreError::Conflict(
            "The account this invite belongs to has been closed".into(),
        )));
    }

    let client_role = RoleRepo::find_by_name(&state.pool, ROLE_CLIENT)
        .await?
        .ok_or_else(|| AppError::InternalError("The client role is not seeded".into()))?;

    let (user, created) = match UserRepo::find_by_email(&state.pool, &invite.email).await? {
        Some(existing) => {
            link_existing(&existing, client_role.id, &input.password)?;
            (existing, false)
        }
        None => {
            let user = create_client(&mut tx, &invite, &input, client_role.id).await?;
            (user, true)
        }
    };

    AccountRepo::add_member_in_tx(&mut tx, invite.account_id, user.id).await?;
    let entity_ids = ClientEntityRepo::list_ids_by_account_in_tx(&mut tx, invite.account_id).await?;
    if !invite.permissions.is_empty() {
        for &entity_id in &entity_ids {
            PermissionRepo::grant_in_tx(&mut tx, user.id, entity_id, &invite.permissions).await?;
        }
    }
    InviteRepo::mark_accepted_in_tx(&mut tx, invite.id).await?;
    tx.commit().await?;

    tracing::info!(
        invite_id = invite.id,
        account_id = invite.account_id,
        user_id = user.id,
        created,
        entities = entity_ids.len(),
        "Invite accepted"
    );
    state.event_bus.publish(
        DomainEvent::new(EVENT_INVITE_ACCEPTED)
            .with_source(SOURCE_INVITE, invite.id)
            .with_actor(user.id)
            .with_payload(json!({
                "account_id": invite.account_id,
                "created_user": created,
            })),
    );

    let response = create_auth_response(&state, &user, ROLE_CLIENT).await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_client(
    tx: &mut taxdesk_db::DbTx<'_>,
    invite: &Invite,
    input: &AcceptInviteRequest,
    role_id: DbId,
) -> AppResult<User> {
    let first_name = pick_name(input.first_name.as_deref(), invite.first_name.as_deref());
    let last_name = pick_name(input.last_name.as_deref(), invite.last_name.as_deref());
    validate_names(&first_name, &last_name)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create_in_tx(
        tx,
        &CreateUser {
            email: invite.email.clone(),
            password_hash,
            first_name,
            last_name,
            role_id,
            staff_role_id: None,
        },
    )
    .await?;
    Ok(user)
}

/// An existing account may take the invite only if it is an active client
/// and the caller knows its password.
fn link_existing(user: &User, client_role_id: DbId, password: &str) -> AppResult<()> {
    if user.role_id != client_role_id {
        return Err(AppError::Core(CoreError::Conflict(
            "This email belongs to a firm user and cannot accept a client invite".into(),
        )));
    }
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "This account has been deactivated".into(),
        )));
    }
    let valid = verify_password(password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "An account with this email exists; enter its current password".into(),
        )));
    }
    Ok(())
}

async fn find_invite(state: &AppState, id: DbId) -> AppResult<Invite> {
    InviteRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Invite", id))
}

fn invalid_token() -> AppError {
    AppError::Core(CoreError::Validation("Invite token is not valid".into()))
}

/// The submitted name when present, else the one on the invite.
fn pick_name(submitted: Option<&str>, invited: Option<&str>) -> String {
    submitted
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or(invited)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_name_wins_over_invite() {
        assert_eq!(pick_name(Some(" Dana "), Some("D.")), "Dana");
        assert_eq!(pick_name(Some("  "), Some("Dana")), "Dana");
        assert_eq!(pick_name(None, None), "");
    }

    #[test]
    fn blank_optional_names_are_dropped() {
        assert_eq!(trimmed(Some("  ".into())), None);
        assert_eq!(trimmed(Some(" Lee ".into())).as_deref(), Some("Lee"));
    }
}
