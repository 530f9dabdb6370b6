//! Repository for the `client_entities` table.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::client_entity::{ClientEntity, CreateClientEntity, UpdateClientEntity};

const COLUMNS: &str =
    "id, account_id, name, entity_type, tax_id_last4, is_active, created_at, updated_at";

/// Provides CRUD operations for client entities.
pub struct ClientEntityRepo;

impl ClientEntityRepo {
    pub async fn create(
        pool: &PgPool,
        account_id: DbId,
        input: &CreateClientEntity,
    ) -> Result<ClientEntity, sqlx::Error> {
        let query = format!(
            "INSERT INTO client_entities (account_id, name, entity_type, tax_id_last4)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientEntity>(&query)
            .bind(account_id)
            .bind(&input.name)
            .bind(&input.entity_type)
            .bind(&input.tax_id_last4)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClientEntity>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM client_entities WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ClientEntity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<ClientEntity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM client_entities
             WHERE account_id = $1 AND deleted_at IS NULL
             ORDER BY name, id"
        );
        sqlx::query_as::<_, ClientEntity>(&query)
            .bind(account_id)
            .fetch_all(pool)
            .await
    }

    /// IDs of every live entity on an account.
    pub async fn list_ids_by_account_in_tx(
        tx: &mut crate::DbTx<'_>,
        account_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM client_entities WHERE account_id = $1 AND deleted_at IS NULL",
        )
        .bind(account_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateClientEntity,
    ) -> Result<Option<ClientEntity>, sqlx::Error> {
        let query = format!(
            "UPDATE client_entities SET
                name = COALESCE($2, name),
                entity_type = COALESCE($3, entity_type),
                tax_id_last4 = COALESCE($4, tax_id_last4),
                is_active = COALESCE($5, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientEntity>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.entity_type)
            .bind(&input.tax_id_last4)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE client_entities SET deleted_at = NOW(), is_active = false
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
