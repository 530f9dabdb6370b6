//! Entity-level access checks for client-facing routes.
//!
//! Firm staff reach every tax year. Client users reach a tax year only
//! through an `entity_permissions` row on its entity; a client with no row
//! gets a 404 so other entity ids stay hidden, and a client missing the
//! specific flag gets a 403.

use taxdesk_core::error::CoreError;
use taxdesk_core::permissions::{has_permission, PERM_VIEW};
use taxdesk_core::types::DbId;
use taxdesk_db::models::tax_year::TaxYearWithEntity;
use taxdesk_db::repositories::{PermissionRepo, TaxYearRepo};
use taxdesk_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Load a tax year and verify `user` holds `permission` on its entity.
pub async fn authorize_tax_year(
    pool: &DbPool,
    user: &AuthUser,
    tax_year_id: DbId,
    permission: &str,
) -> AppResult<TaxYearWithEntity> {
    let year = TaxYearRepo::find_with_entity(pool, tax_year_id)
        .await?
        .ok_or(AppError::not_found("TaxYear", tax_year_id))?;

    authorize_entity(pool, user, year.client_entity_id, permission)
        .await
        .map_err(|err| match err {
            AppError::Core(CoreError::NotFound { .. }) => {
                AppError::not_found("TaxYear", tax_year_id)
            }
            other => other,
        })?;

    Ok(year)
}

/// Verify `user` holds `permission` on a client entity.
pub async fn authorize_entity(
    pool: &DbPool,
    user: &AuthUser,
    client_entity_id: DbId,
    permission: &str,
) -> AppResult<()> {
    if user.is_firm() {
        return Ok(());
    }

    let flags = PermissionRepo::flags_for(pool, user.user_id, client_entity_id).await?;
    if !has_permission(&flags, PERM_VIEW) {
        return Err(AppError::not_found("ClientEntity", client_entity_id));
    }
    if !has_permission(&flags, permission) {
        tracing::debug!(
            user_id = user.user_id,
            client_entity_id,
            permission,
            "Client lacks permission"
        );
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "The '{permission}' permission is required for this entity"
        ))));
    }
    Ok(())
}
