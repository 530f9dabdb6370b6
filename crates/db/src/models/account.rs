//! Account and account membership models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from the `accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: DbId,
    pub name: String,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// A member of an account joined with the user's public fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountMember {
    pub account_id: DbId,
    pub user_id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Request body for adding an existing user to an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AddAccountUser {
    pub user_id: DbId,
    #[serde(default)]
    pub is_primary: bool,
}
