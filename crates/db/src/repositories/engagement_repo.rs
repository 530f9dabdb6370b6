//! Repository for `engagement_signers` and `engagement_signatures`.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::engagement::{CreateSignature, EngagementSignature, EngagementSigner};
use crate::DbTx;

const SIGNATURE_COLUMNS: &str =
    "id, entity_tax_year_id, user_id, signature_name, ip_address, user_agent, signed_at";

/// Signer configuration and signature records for engagement letters.
pub struct EngagementRepo;

impl EngagementRepo {
    pub async fn list_signers(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<EngagementSigner>, sqlx::Error> {
        sqlx::query_as::<_, EngagementSigner>(
            "SELECT es.entity_tax_year_id, es.user_id, u.first_name, u.last_name, u.email
             FROM engagement_signers es
             JOIN users u ON u.id = es.user_id
             WHERE es.entity_tax_year_id = $1
             ORDER BY u.last_name, u.first_name",
        )
        .bind(entity_tax_year_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the required signer set.
    pub async fn replace_signers_in_tx(
        tx: &mut DbTx<'_>,
        entity_tax_year_id: DbId,
        user_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM engagement_signers WHERE entity_tax_year_id = $1")
            .bind(entity_tax_year_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            "INSERT INTO engagement_signers (entity_tax_year_id, user_id)
             SELECT $1, unnest($2::BIGINT[])
             ON CONFLICT DO NOTHING",
        )
        .bind(entity_tax_year_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn required_signer_ids_in_tx(
        tx: &mut DbTx<'_>,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT user_id FROM engagement_signers WHERE entity_tax_year_id = $1",
        )
        .bind(entity_tax_year_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn signed_user_ids_in_tx(
        tx: &mut DbTx<'_>,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT user_id FROM engagement_signatures WHERE entity_tax_year_id = $1",
        )
        .bind(entity_tax_year_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn list_signatures(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<EngagementSignature>, sqlx::Error> {
        let query = format!(
            "SELECT {SIGNATURE_COLUMNS} FROM engagement_signatures
             WHERE entity_tax_year_id = $1
             ORDER BY signed_at"
        );
        sqlx::query_as::<_, EngagementSignature>(&query)
            .bind(entity_tax_year_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create_signature_in_tx(
        tx: &mut DbTx<'_>,
        input: &CreateSignature,
    ) -> Result<EngagementSignature, sqlx::Error> {
        let query = format!(
            "INSERT INTO engagement_signatures
                (entity_tax_year_id, user_id, signature_name, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SIGNATURE_COLUMNS}"
        );
        sqlx::query_as::<_, EngagementSignature>(&query)
            .bind(input.entity_tax_year_id)
            .bind(input.user_id)
            .bind(&input.signature_name)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .fetch_one(&mut **tx)
            .await
    }
}
