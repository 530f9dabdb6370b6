//! Periodic delivery of queued client invites.
//!
//! Invite tokens are never stored in plain text, so the dispatcher issues a
//! fresh token for each delivery, mails the link and records the new hash in
//! the same update that marks the invite `sent`. A failed delivery bumps the
//! attempt counter; invites that run out of attempts stay queued but are no
//! longer picked up.

use std::time::Duration;

use taxdesk_core::hashing::sha256_hex;
use taxdesk_core::invites::{acceptance_link, MAX_DELIVERY_ATTEMPTS};
use taxdesk_db::models::invite::Invite;
use taxdesk_db::repositories::InviteRepo;
use taxdesk_db::DbPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::delivery::email::EmailDelivery;

/// Invites handled per tick.
const BATCH_SIZE: i64 = 50;

/// Issue a random invite token, returning `(plaintext, sha256_hex_hash)`.
pub fn issue_invite_token() -> (String, String) {
    let plaintext = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let hash = sha256_hex(plaintext.as_bytes());
    (plaintext, hash)
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Base URL of the client app; links are `{base}/invite/accept?token=...`.
    pub base_url: String,
    pub interval: Duration,
}

/// Background service that sends queued invites.
pub struct InviteDispatcher {
    pool: DbPool,
    config: DispatcherConfig,
    email: Option<EmailDelivery>,
}

impl InviteDispatcher {
    /// Without an [`EmailDelivery`] the acceptance link is logged instead.
    pub fn new(pool: DbPool, config: DispatcherConfig, email: Option<EmailDelivery>) -> Self {
        Self {
            pool,
            config,
            email,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Invite dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch_due().await {
                        tracing::error!(error = %e, "Failed to dispatch invites");
                    }
                }
            }
        }
    }

    /// Deliver every due invite once. Returns how many were sent.
    pub async fn dispatch_due(&self) -> Result<usize, sqlx::Error> {
        let due =
            InviteRepo::list_due_for_delivery(&self.pool, MAX_DELIVERY_ATTEMPTS, BATCH_SIZE)
                .await?;

        let mut sent = 0;
        for invite in &due {
            if self.deliver(invite).await? {
                sent += 1;
            }
        }

        if !due.is_empty() {
            tracing::info!(due = due.len(), sent, "Processed invite queue");
        }
        Ok(sent)
    }

    async fn deliver(&self, invite: &Invite) -> Result<bool, sqlx::Error> {
        let (token, token_hash) = issue_invite_token();
        let link = acceptance_link(&self.config.base_url, &token);

        match &self.email {
            Some(email) => {
                let name = invite.first_name.as_deref();
                if let Err(e) = email
                    .send_invite(&invite.email, name, &link, invite.expires_at)
                    .await
                {
                    tracing::warn!(
                        invite_id = invite.id,
                        attempts = invite.attempts + 1,
                        error = %e,
                        "Invite delivery failed"
                    );
                    InviteRepo::record_failure(&self.pool, invite.id, &e.to_string()).await?;
                    return Ok(false);
                }
            }
            None => {
                tracing::info!(
                    invite_id = invite.id,
                    email = %invite.email,
                    %link,
                    "SMTP not configured, invite link logged instead of mailed"
                );
            }
        }

        let marked = InviteRepo::mark_sent(&self.pool, invite.id, &token_hash).await?;
        if !marked {
            tracing::info!(invite_id = invite.id, "Invite revoked during delivery");
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_hashed() {
        let (a, hash_a) = issue_invite_token();
        let (b, _) = issue_invite_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(hash_a, sha256_hex(a.as_bytes()));
    }
}
