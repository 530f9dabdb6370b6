//! Repository for the `accounts` and `account_users` tables.

use sqlx::PgPool;
use taxdesk_core::invites::{INVITE_QUEUED, INVITE_REVOKED, INVITE_SENT};
use taxdesk_core::types::DbId;

use crate::models::account::{Account, AccountMember, AddAccountUser, CreateAccount, UpdateAccount};

const COLUMNS: &str = "id, name, notes, is_active, created_at, updated_at";

/// Provides CRUD operations for accounts and their members.
pub struct AccountRepo;

impl AccountRepo {
    pub async fn create(pool: &PgPool, input: &CreateAccount) -> Result<Account, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (name, notes) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(&input.name)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Find a live (not soft-deleted) account.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List live accounts by name, optionally filtered by a name substring.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM accounts
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
             ORDER BY name, id
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAccount,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query = format!(
            "UPDATE accounts SET
                name = COALESCE($2, name),
                notes = COALESCE($3, notes),
                is_active = COALESCE($4, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.notes)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an account with its entities and revoke its pending
    /// invites. Returns `true` if a live row was marked.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE accounts SET deleted_at = NOW(), is_active = false
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE client_entities SET deleted_at = NOW(), is_active = false
             WHERE account_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE invites SET status = $2
             WHERE account_id = $1 AND status IN ($3, $4)",
        )
        .bind(id)
        .bind(INVITE_REVOKED)
        .bind(INVITE_QUEUED)
        .bind(INVITE_SENT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    // -- Members ---------------------------------------------------------

    pub async fn list_members(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<AccountMember>, sqlx::Error> {
        sqlx::query_as::<_, AccountMember>(
            "SELECT au.account_id, au.user_id, u.email, u.first_name, u.last_name,
                    au.is_primary, u.is_active, au.created_at
             FROM account_users au
             JOIN users u ON u.id = au.user_id
             WHERE au.account_id = $1
             ORDER BY au.is_primary DESC, u.last_name, u.first_name",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await
    }

    /// Add a user to an account. A repeat add updates `is_primary`.
    pub async fn add_member(
        pool: &PgPool,
        account_id: DbId,
        input: &AddAccountUser,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO account_users (account_id, user_id, is_primary)
             VALUES ($1, $2, $3)
             ON CONFLICT (account_id, user_id) DO UPDATE SET is_primary = EXCLUDED.is_primary",
        )
        .bind(account_id)
        .bind(input.user_id)
        .bind(input.is_primary)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Add a member inside a transaction, leaving existing rows untouched.
    pub async fn add_member_in_tx(
        tx: &mut crate::DbTx<'_>,
        account_id: DbId,
        user_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO account_users (account_id, user_id)
             VALUES ($1, $2)
             ON CONFLICT (account_id, user_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Remove a user from an account together with their ACL rows on the
    /// account's entities.
    pub async fn remove_member(
        pool: &PgPool,
        account_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "DELETE FROM entity_permissions
             WHERE user_id = $1
               AND client_entity_id IN (SELECT id FROM client_entities WHERE account_id = $2)",
        )
        .bind(user_id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM account_users WHERE account_id = $1 AND user_id = $2")
            .bind(account_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_member(
        pool: &PgPool,
        account_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM account_users WHERE account_id = $1 AND user_id = $2)",
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
