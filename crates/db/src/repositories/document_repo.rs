//! Repository for the `documents` table.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::document::{CreateDocument, Document};
use crate::DbTx;

const COLUMNS: &str = "id, entity_tax_year_id, checklist_item_id, uploaded_by, original_filename, \
                        stored_path, content_type, size_bytes, sha256, created_at, updated_at";

/// Provides operations on uploaded documents. Deletion is soft.
pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create_in_tx(
        tx: &mut DbTx<'_>,
        input: &CreateDocument,
    ) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents
                (entity_tax_year_id, checklist_item_id, uploaded_by, original_filename,
                 stored_path, content_type, size_bytes, sha256)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.entity_tax_year_id)
            .bind(input.checklist_item_id)
            .bind(input.uploaded_by)
            .bind(&input.original_filename)
            .bind(&input.stored_path)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.sha256)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_tax_year(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents
             WHERE entity_tax_year_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(entity_tax_year_id)
            .fetch_all(pool)
            .await
    }

    /// Checklist item of every live document on the tax year that has one.
    pub async fn documented_item_ids_in_tx(
        tx: &mut DbTx<'_>,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT checklist_item_id FROM documents
             WHERE entity_tax_year_id = $1
               AND deleted_at IS NULL
               AND checklist_item_id IS NOT NULL",
        )
        .bind(entity_tax_year_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn soft_delete_in_tx(tx: &mut DbTx<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
