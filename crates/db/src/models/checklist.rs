//! Document checklist items.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::documents::ChecklistRequirement;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `checklist_items`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItem {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub label: String,
    pub description: Option<String>,
    pub is_required: bool,
    pub is_not_applicable: bool,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChecklistItem {
    pub fn requirement(&self) -> ChecklistRequirement {
        ChecklistRequirement {
            id: self.id,
            is_required: self.is_required,
            is_not_applicable: self.is_not_applicable,
        }
    }
}

/// Checklist item with the number of live documents attached.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItemWithCount {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub label: String,
    pub description: Option<String>,
    pub is_required: bool,
    pub is_not_applicable: bool,
    pub sort_order: i32,
    pub document_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChecklistItem {
    pub label: String,
    pub description: Option<String>,
    pub is_required: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChecklistItem {
    pub label: Option<String>,
    pub description: Option<String>,
    pub is_required: Option<bool>,
    pub sort_order: Option<i32>,
}
