//! Repository for the `checklist_items` table.

use sqlx::PgPool;
use taxdesk_core::documents::ChecklistRequirement;
use taxdesk_core::types::DbId;

use crate::models::checklist::{
    ChecklistItem, ChecklistItemWithCount, CreateChecklistItem, UpdateChecklistItem,
};
use crate::DbTx;

const COLUMNS: &str = "id, entity_tax_year_id, label, description, is_required, \
                        is_not_applicable, sort_order, created_at, updated_at";

/// Provides CRUD operations for checklist items.
pub struct ChecklistRepo;

impl ChecklistRepo {
    pub async fn create(
        pool: &PgPool,
        entity_tax_year_id: DbId,
        input: &CreateChecklistItem,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO checklist_items (entity_tax_year_id, label, description, is_required, sort_order)
             VALUES ($1, $2, $3, COALESCE($4, true), COALESCE($5, 0))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(entity_tax_year_id)
            .bind(&input.label)
            .bind(&input.description)
            .bind(input.is_required)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM checklist_items WHERE id = $1");
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Items for a tax year with their live document counts.
    pub async fn list_with_counts(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<ChecklistItemWithCount>, sqlx::Error> {
        sqlx::query_as::<_, ChecklistItemWithCount>(
            "SELECT ci.id, ci.entity_tax_year_id, ci.label, ci.description, ci.is_required,
                    ci.is_not_applicable, ci.sort_order,
                    COUNT(d.id) AS document_count
             FROM checklist_items ci
             LEFT JOIN documents d ON d.checklist_item_id = ci.id AND d.deleted_at IS NULL
             WHERE ci.entity_tax_year_id = $1
             GROUP BY ci.id
             ORDER BY ci.sort_order, ci.id",
        )
        .bind(entity_tax_year_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_requirements_in_tx(
        tx: &mut DbTx<'_>,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<ChecklistRequirement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM checklist_items WHERE entity_tax_year_id = $1"
        );
        let items = sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(entity_tax_year_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(items.iter().map(ChecklistItem::requirement).collect())
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateChecklistItem,
    ) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query = format!(
            "UPDATE checklist_items SET
                label = COALESCE($2, label),
                description = COALESCE($3, description),
                is_required = COALESCE($4, is_required),
                sort_order = COALESCE($5, sort_order)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .bind(&input.label)
            .bind(&input.description)
            .bind(input.is_required)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_not_applicable_in_tx(
        tx: &mut DbTx<'_>,
        id: DbId,
        not_applicable: bool,
    ) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query = format!(
            "UPDATE checklist_items SET is_not_applicable = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .bind(not_applicable)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM checklist_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
