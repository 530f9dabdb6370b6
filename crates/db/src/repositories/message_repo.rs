//! Repository for `message_threads` and `messages`.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::message::{Message, MessageThread};

/// Joined message columns; expects aliases `m`, `u` and `r`.
const MESSAGE_COLUMNS: &str = "m.id, m.thread_id, m.sender_id, \
                                (u.first_name || ' ' || u.last_name) AS sender_name, \
                                r.name AS sender_role, m.body, m.created_at";

/// Provides operations on tax-year message threads.
pub struct MessageRepo;

impl MessageRepo {
    /// Return the tax year's thread, creating it on first use.
    pub async fn get_or_create_thread(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<MessageThread, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<_, MessageThread>(
            "INSERT INTO message_threads (entity_tax_year_id)
             VALUES ($1)
             ON CONFLICT (entity_tax_year_id)
             DO UPDATE SET entity_tax_year_id = EXCLUDED.entity_tax_year_id
             RETURNING id, entity_tax_year_id, created_at",
        )
        .bind(entity_tax_year_id)
        .fetch_one(pool)
        .await
    }

    /// Messages with `id > after_id`, oldest first.
    pub async fn list_after(
        pool: &PgPool,
        thread_id: DbId,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             JOIN roles r ON r.id = u.role_id
             WHERE m.thread_id = $1 AND m.id > $2
             ORDER BY m.id ASC
             LIMIT $3"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(thread_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        thread_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        let query = format!(
            "WITH m AS (
                INSERT INTO messages (thread_id, sender_id, body)
                VALUES ($1, $2, $3)
                RETURNING id, thread_id, sender_id, body, created_at
             )
             SELECT {MESSAGE_COLUMNS}
             FROM m
             JOIN users u ON u.id = m.sender_id
             JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(thread_id)
            .bind(sender_id)
            .bind(body)
            .fetch_one(pool)
            .await
    }
}
