//! Persisted activity events.

use serde::Serialize;
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `activity_events`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityEvent {
    pub id: DbId,
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
