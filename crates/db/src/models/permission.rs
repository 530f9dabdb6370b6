//! Per-entity client ACL rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `entity_permissions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityPermission {
    pub id: DbId,
    pub user_id: DbId,
    pub client_entity_id: DbId,
    pub permissions: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One ACL entry as sent by the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclEntry {
    pub user_id: DbId,
    pub client_entity_id: DbId,
    pub permissions: Vec<String>,
}
