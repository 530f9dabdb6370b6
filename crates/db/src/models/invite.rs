//! Client invitations.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `invites`. The token hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invite {
    pub id: DbId,
    pub account_id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permissions: Vec<String>,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub invited_by: Option<DbId>,
    pub expires_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub accepted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for queueing an invite.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInviteRequest {
    pub account_id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// DTO for inserting an invite.
pub struct CreateInvite {
    pub account_id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permissions: Vec<String>,
    pub token_hash: String,
    pub invited_by: Option<DbId>,
    pub expires_at: Timestamp,
}
