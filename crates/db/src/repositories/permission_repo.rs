//! Repository for the `entity_permissions` ACL table.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::permission::{AclEntry, EntityPermission};
use crate::DbTx;

const COLUMNS: &str = "id, user_id, client_entity_id, permissions, created_at, updated_at";

/// Per-user, per-entity client permission flags.
pub struct PermissionRepo;

impl PermissionRepo {
    /// The flags `user_id` holds on `client_entity_id`; empty when no row.
    pub async fn flags_for(
        pool: &PgPool,
        user_id: DbId,
        client_entity_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        let row: Option<(Vec<String>,)> = sqlx::query_as(
            "SELECT ep.permissions
             FROM entity_permissions ep
             JOIN client_entities ce ON ce.id = ep.client_entity_id
             WHERE ep.user_id = $1 AND ep.client_entity_id = $2 AND ce.deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(client_entity_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(flags,)| flags).unwrap_or_default())
    }

    /// Every ACL row on the account's live entities.
    pub async fn list_for_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<EntityPermission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_permissions
             WHERE client_entity_id IN (
                SELECT id FROM client_entities WHERE account_id = $1 AND deleted_at IS NULL
             )
             ORDER BY user_id, client_entity_id"
        );
        sqlx::query_as::<_, EntityPermission>(&query)
            .bind(account_id)
            .fetch_all(pool)
            .await
    }

    /// Replace all ACL rows on the account's entities with `entries`.
    /// Entries with no flags are dropped rather than stored empty.
    pub async fn replace_for_account_in_tx(
        tx: &mut DbTx<'_>,
        account_id: DbId,
        entries: &[AclEntry],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM entity_permissions
             WHERE client_entity_id IN (SELECT id FROM client_entities WHERE account_id = $1)",
        )
        .bind(account_id)
        .execute(&mut **tx)
        .await?;

        for entry in entries.iter().filter(|e| !e.permissions.is_empty()) {
            sqlx::query(
                "INSERT INTO entity_permissions (user_id, client_entity_id, permissions)
                 VALUES ($1, $2, $3)",
            )
            .bind(entry.user_id)
            .bind(entry.client_entity_id)
            .bind(&entry.permissions)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Insert or overwrite one ACL row.
    pub async fn grant_in_tx(
        tx: &mut DbTx<'_>,
        user_id: DbId,
        client_entity_id: DbId,
        permissions: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entity_permissions (user_id, client_entity_id, permissions)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, client_entity_id)
             DO UPDATE SET permissions = EXCLUDED.permissions",
        )
        .bind(user_id)
        .bind(client_entity_id)
        .bind(permissions)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
