//! Repository for the `staff_roles` table.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::staff_role::{CreateStaffRole, StaffRole, UpdateStaffRole};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for staff job titles.
pub struct StaffRoleRepo;

impl StaffRoleRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateStaffRole,
    ) -> Result<StaffRole, sqlx::Error> {
        let query = format!(
            "INSERT INTO staff_roles (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StaffRole>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<StaffRole>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff_roles WHERE id = $1");
        sqlx::query_as::<_, StaffRole>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<StaffRole>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff_roles ORDER BY name");
        sqlx::query_as::<_, StaffRole>(&query).fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStaffRole,
    ) -> Result<Option<StaffRole>, sqlx::Error> {
        let query = format!(
            "UPDATE staff_roles SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StaffRole>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a staff role. Users holding it fall back to no title.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM staff_roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
