//! Tax-year message threads.

use serde::Serialize;
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `message_threads`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageThread {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub created_at: Timestamp,
}

/// A message joined with its sender's name and role.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub thread_id: DbId,
    pub sender_id: DbId,
    pub sender_name: String,
    pub sender_role: String,
    pub body: String,
    pub created_at: Timestamp,
}
