//! Uploaded client documents.

use serde::Serialize;
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `documents`. The on-disk path is not exposed to clients.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub checklist_item_id: Option<DbId>,
    pub uploaded_by: DbId,
    pub original_filename: String,
    #[serde(skip_serializing)]
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a document after the file has been written.
pub struct CreateDocument {
    pub entity_tax_year_id: DbId,
    pub checklist_item_id: Option<DbId>,
    pub uploaded_by: DbId,
    pub original_filename: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}
