//! Periodic purge of dead refresh-token sessions.
//!
//! Sessions are revoked on every refresh, logout and password reset, so
//! `user_sessions` grows with each login. This job deletes rows that expired
//! or were revoked more than `retention_days` ago.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use taxdesk_db::repositories::SessionRepo;
use tokio_util::sync::CancellationToken;

/// Default number of days a dead session is kept for troubleshooting.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the purge loop until `cancel` fires.
pub async fn run(pool: PgPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = PURGE_INTERVAL.as_secs(),
        "Session retention job started"
    );

    let mut interval = tokio::time::interval(PURGE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge(&pool, retention_days).await {
                    Ok(0) => tracing::debug!("Session retention: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Session retention: purged sessions"),
                    Err(e) => tracing::error!(error = %e, "Session retention: purge failed"),
                }
            }
        }
    }
}

/// One purge pass. Returns the number of deleted sessions.
pub async fn purge(pool: &PgPool, retention_days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days);
    SessionRepo::purge_before(pool, cutoff).await
}
