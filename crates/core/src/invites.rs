//! Client invitation rules.
//!
//! Staff queue an invite for an email address on an account. The dispatcher
//! sends it, and the recipient accepts it with the token from the link.

use crate::types::Timestamp;

pub const INVITE_QUEUED: &str = "queued";
pub const INVITE_SENT: &str = "sent";
pub const INVITE_ACCEPTED: &str = "accepted";
pub const INVITE_REVOKED: &str = "revoked";

/// All valid invite status strings.
pub const VALID_INVITE_STATUSES: &[&str] =
    &[INVITE_QUEUED, INVITE_SENT, INVITE_ACCEPTED, INVITE_REVOKED];

/// How long an invite link stays valid.
pub const DEFAULT_INVITE_LIFETIME_DAYS: i64 = 14;

/// Delivery attempts before the dispatcher stops retrying an invite.
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;

/// Maximum length of an email address (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Light structural email check: one `@`, non-empty local part, a dotted
/// domain, no whitespace. Deliverability is the SMTP server's problem.
pub fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || Err(format!("Invalid email address '{email}'"));

    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return invalid();
    }
    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };
    if local.is_empty() || domain.contains('@') {
        return invalid();
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return invalid();
    }
    Ok(())
}

/// Lowercase and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn is_expired(expires_at: Timestamp, now: Timestamp) -> bool {
    expires_at <= now
}

/// An invite can be accepted once it has been queued or sent.
pub fn can_accept(status: &str) -> bool {
    status == INVITE_QUEUED || status == INVITE_SENT
}

/// Accepted or already revoked invites cannot be revoked.
pub fn can_revoke(status: &str) -> bool {
    status == INVITE_QUEUED || status == INVITE_SENT
}

/// Build the acceptance link mailed to the invitee.
pub fn acceptance_link(base_url: &str, token: &str) -> String {
    format!("{}/invite/accept?token={token}", base_url.trim_end_matches('/'))
}
