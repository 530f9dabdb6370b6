//! Client entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A taxable entity under an account, from `client_entities`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientEntity {
    pub id: DbId,
    pub account_id: DbId,
    pub name: String,
    pub entity_type: String,
    pub tax_id_last4: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a client entity. `account_id` comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientEntity {
    pub name: String,
    pub entity_type: String,
    pub tax_id_last4: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClientEntity {
    pub name: Option<String>,
    pub entity_type: Option<String>,
    pub tax_id_last4: Option<String>,
    pub is_active: Option<bool>,
}
