//! Staff job titles (preparer, reviewer, ...).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from the `staff_roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffRole {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaffRole {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStaffRole {
    pub name: Option<String>,
    pub description: Option<String>,
}
