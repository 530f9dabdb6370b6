//! Repository for the `entity_tax_years` table.
//!
//! Workflow writes (`set_status`, `authorize_efile`, ...) take a
//! transaction: callers lock the row with [`TaxYearRepo::lock_in_tx`], check
//! the transition against the loaded facts, then write.

use sqlx::PgPool;
use taxdesk_core::engagement::EngagementStatus;
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::InternalStatus;

use crate::models::tax_year::{CreateTaxYear, EntityTaxYear, TaxYearWithEntity, UpdateTaxYear};
use crate::DbTx;

const COLUMNS: &str = "id, client_entity_id, tax_year, internal_status_id, engagement_status_id, \
                        assigned_staff_id, documents_confirmed_at, efile_authorized_at, \
                        efile_authorized_by, efile_signature_name, extension_requested_at, \
                        extension_requested_by, filed_at, created_at, updated_at";

/// Joined columns for [`TaxYearWithEntity`]; expects aliases `ty` and `ce`.
const WITH_ENTITY_COLUMNS: &str = "ty.id, ty.client_entity_id, ce.name AS entity_name, \
                                    ce.entity_type, ce.account_id, ty.tax_year, \
                                    ty.internal_status_id, ty.engagement_status_id, \
                                    ty.documents_confirmed_at, ty.efile_authorized_at, \
                                    ty.extension_requested_at";

/// Provides CRUD and workflow writes for entity tax years.
pub struct TaxYearRepo;

impl TaxYearRepo {
    pub async fn create(
        pool: &PgPool,
        client_entity_id: DbId,
        input: &CreateTaxYear,
    ) -> Result<EntityTaxYear, sqlx::Error> {
        let query = format!(
            "INSERT INTO entity_tax_years (client_entity_id, tax_year, assigned_staff_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntityTaxYear>(&query)
            .bind(client_entity_id)
            .bind(input.tax_year)
            .bind(input.assigned_staff_id)
            .fetch_one(pool)
            .await
    }

    /// Find a tax year whose entity has not been deleted.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EntityTaxYear>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_tax_years
             WHERE id = $1
               AND client_entity_id IN (SELECT id FROM client_entities WHERE deleted_at IS NULL)"
        );
        sqlx::query_as::<_, EntityTaxYear>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a tax year joined with its entity (used for access checks).
    pub async fn find_with_entity(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TaxYearWithEntity>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_ENTITY_COLUMNS}
             FROM entity_tax_years ty
             JOIN client_entities ce ON ce.id = ty.client_entity_id
             WHERE ty.id = $1 AND ce.deleted_at IS NULL"
        );
        sqlx::query_as::<_, TaxYearWithEntity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_entity(
        pool: &PgPool,
        client_entity_id: DbId,
    ) -> Result<Vec<EntityTaxYear>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_tax_years
             WHERE client_entity_id = $1
             ORDER BY tax_year DESC"
        );
        sqlx::query_as::<_, EntityTaxYear>(&query)
            .bind(client_entity_id)
            .fetch_all(pool)
            .await
    }

    /// Tax years a client user can see through their ACL rows.
    pub async fn list_visible_to_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TaxYearWithEntity>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_ENTITY_COLUMNS}
             FROM entity_tax_years ty
             JOIN client_entities ce ON ce.id = ty.client_entity_id
             JOIN entity_permissions ep ON ep.client_entity_id = ce.id
             WHERE ep.user_id = $1
               AND cardinality(ep.permissions) > 0
               AND ce.deleted_at IS NULL
               AND ce.is_active = true
             ORDER BY ty.tax_year DESC, ce.name"
        );
        sqlx::query_as::<_, TaxYearWithEntity>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Tax years across all live entities, for firm users.
    pub async fn list_all(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TaxYearWithEntity>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_ENTITY_COLUMNS}
             FROM entity_tax_years ty
             JOIN client_entities ce ON ce.id = ty.client_entity_id
             WHERE ce.deleted_at IS NULL
             ORDER BY ty.tax_year DESC, ce.name
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, TaxYearWithEntity>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTaxYear,
    ) -> Result<Option<EntityTaxYear>, sqlx::Error> {
        let query = format!(
            "UPDATE entity_tax_years SET assigned_staff_id = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntityTaxYear>(&query)
            .bind(id)
            .bind(input.assigned_staff_id)
            .fetch_optional(pool)
            .await
    }

    // -- Workflow (transactional) -----------------------------------------

    /// Load and row-lock a tax year for the rest of the transaction.
    pub async fn lock_in_tx(
        tx: &mut DbTx<'_>,
        id: DbId,
    ) -> Result<Option<EntityTaxYear>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_tax_years
             WHERE id = $1
               AND client_entity_id IN (SELECT id FROM client_entities WHERE deleted_at IS NULL)
             FOR UPDATE"
        );
        sqlx::query_as::<_, EntityTaxYear>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn set_status(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: InternalStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE entity_tax_years SET internal_status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_engagement_status(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: EngagementStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE entity_tax_years SET engagement_status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn mark_documents_confirmed(tx: &mut DbTx<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE entity_tax_years SET documents_confirmed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn authorize_efile(
        tx: &mut DbTx<'_>,
        id: DbId,
        user_id: DbId,
        signature_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entity_tax_years SET
                efile_authorized_at = NOW(),
                efile_authorized_by = $2,
                efile_signature_name = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(user_id)
        .bind(signature_name)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn request_extension(
        tx: &mut DbTx<'_>,
        id: DbId,
        user_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entity_tax_years SET
                extension_requested_at = NOW(),
                extension_requested_by = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_filed(tx: &mut DbTx<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entity_tax_years SET internal_status_id = $2, filed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(InternalStatus::Filed.id())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Clear the milestones recorded at or after `target` when staff reopen
    /// a tax year.
    ///
    /// Reopening to `SIGN_ENGAGEMENT` also drops every engagement signature.
    pub async fn reset_for_reopen(
        tx: &mut DbTx<'_>,
        id: DbId,
        target: InternalStatus,
    ) -> Result<(), sqlx::Error> {
        if target == InternalStatus::SignEngagement {
            sqlx::query("DELETE FROM engagement_signatures WHERE entity_tax_year_id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }

        sqlx::query(
            "UPDATE entity_tax_years SET
                engagement_status_id = CASE WHEN $2 THEN $6 ELSE engagement_status_id END,
                documents_confirmed_at = CASE WHEN $3 THEN NULL ELSE documents_confirmed_at END,
                efile_authorized_at = CASE WHEN $4 THEN NULL ELSE efile_authorized_at END,
                efile_authorized_by = CASE WHEN $4 THEN NULL ELSE efile_authorized_by END,
                efile_signature_name = CASE WHEN $4 THEN NULL ELSE efile_signature_name END,
                filed_at = CASE WHEN $5 THEN NULL ELSE filed_at END
             WHERE id = $1",
        )
        .bind(id)
        .bind(target == InternalStatus::SignEngagement)
        .bind(target <= InternalStatus::ConfirmDocuments)
        .bind(target < InternalStatus::SignEfile)
        .bind(target < InternalStatus::Filed)
        .bind(EngagementStatus::NotStarted.id())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
