//! Repository for the `invites` table.

use sqlx::PgPool;
use taxdesk_core::invites::{INVITE_ACCEPTED, INVITE_QUEUED, INVITE_REVOKED, INVITE_SENT};
use taxdesk_core::types::{DbId, Timestamp};

use crate::models::invite::{CreateInvite, Invite};
use crate::DbTx;

const COLUMNS: &str = "id, account_id, email, first_name, last_name, permissions, token_hash, \
                        status, attempts, last_error, invited_by, expires_at, sent_at, \
                        accepted_at, created_at, updated_at";

/// Provides operations on client invitations.
pub struct InviteRepo;

impl InviteRepo {
    pub async fn create(pool: &PgPool, input: &CreateInvite) -> Result<Invite, sqlx::Error> {
        let query = format!(
            "INSERT INTO invites
                (account_id, email, first_name, last_name, permissions, token_hash,
                 invited_by, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invite>(&query)
            .bind(input.account_id)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.permissions)
            .bind(&input.token_hash)
            .bind(input.invited_by)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Invite>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invites WHERE id = $1");
        sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find and row-lock an invite by token hash.
    pub async fn lock_by_token_hash_in_tx(
        tx: &mut DbTx<'_>,
        token_hash: &str,
    ) -> Result<Option<Invite>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invites WHERE token_hash = $1 FOR UPDATE");
        sqlx::query_as::<_, Invite>(&query)
            .bind(token_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Queued and sent invites, newest first.
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invites
             WHERE status IN ($1, $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Invite>(&query)
            .bind(INVITE_QUEUED)
            .bind(INVITE_SENT)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Queued, unexpired invites that still have delivery attempts left.
    pub async fn list_due_for_delivery(
        pool: &PgPool,
        max_attempts: i32,
        batch_size: i64,
    ) -> Result<Vec<Invite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invites
             WHERE status = $1 AND attempts < $2 AND expires_at > NOW()
               AND account_id IN (SELECT id FROM accounts WHERE deleted_at IS NULL)
             ORDER BY created_at, id
             LIMIT $3"
        );
        sqlx::query_as::<_, Invite>(&query)
            .bind(INVITE_QUEUED)
            .bind(max_attempts)
            .bind(batch_size)
            .fetch_all(pool)
            .await
    }

    /// Mark a queued invite as sent under the token that went out in the
    /// email. A concurrent revoke wins.
    pub async fn mark_sent(pool: &PgPool, id: DbId, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invites SET status = $2, token_hash = $3, sent_at = NOW(),
                                attempts = attempts + 1, last_error = NULL
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(INVITE_SENT)
        .bind(token_hash)
        .bind(INVITE_QUEUED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_failure(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE invites SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Revoke a queued or sent invite.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<Option<Invite>, sqlx::Error> {
        let query = format!(
            "UPDATE invites SET status = $2
             WHERE id = $1 AND status IN ($3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .bind(INVITE_REVOKED)
            .bind(INVITE_QUEUED)
            .bind(INVITE_SENT)
            .fetch_optional(pool)
            .await
    }

    /// Put an invite back on the queue with a fresh token and expiry.
    pub async fn requeue(
        pool: &PgPool,
        id: DbId,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<Option<Invite>, sqlx::Error> {
        let query = format!(
            "UPDATE invites SET
                status = $2, token_hash = $3, expires_at = $4,
                attempts = 0, last_error = NULL, sent_at = NULL
             WHERE id = $1 AND status IN ($2, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .bind(INVITE_QUEUED)
            .bind(token_hash)
            .bind(expires_at)
            .bind(INVITE_SENT)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_accepted_in_tx(tx: &mut DbTx<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE invites SET status = $2, accepted_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(INVITE_ACCEPTED)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
