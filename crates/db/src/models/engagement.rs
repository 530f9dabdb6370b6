//! Engagement letter signers and signatures.

use serde::Serialize;
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A required signer, joined with the user's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EngagementSigner {
    pub entity_tax_year_id: DbId,
    pub user_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A row from `engagement_signatures`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EngagementSignature {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub user_id: DbId,
    pub signature_name: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub signed_at: Timestamp,
}

/// DTO for recording a signature.
pub struct CreateSignature {
    pub entity_tax_year_id: DbId,
    pub user_id: DbId,
    pub signature_name: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
