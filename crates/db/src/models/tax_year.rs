//! Entity tax year model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::engagement::EngagementStatus;
use taxdesk_core::error::CoreError;
use taxdesk_core::types::{DbId, StatusId, Timestamp};
use taxdesk_core::workflow::InternalStatus;

/// One tax year's engagement record for a client entity.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityTaxYear {
    pub id: DbId,
    pub client_entity_id: DbId,
    pub tax_year: i32,
    pub internal_status_id: StatusId,
    pub engagement_status_id: StatusId,
    pub assigned_staff_id: Option<DbId>,
    pub documents_confirmed_at: Option<Timestamp>,
    pub efile_authorized_at: Option<Timestamp>,
    pub efile_authorized_by: Option<DbId>,
    pub efile_signature_name: Option<String>,
    pub extension_requested_at: Option<Timestamp>,
    pub extension_requested_by: Option<DbId>,
    pub filed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntityTaxYear {
    /// The persisted workflow stage.
    pub fn status(&self) -> Result<InternalStatus, CoreError> {
        decode_status(self.id, self.internal_status_id)
    }

    /// The persisted engagement signing status.
    pub fn engagement_status(&self) -> Result<EngagementStatus, CoreError> {
        decode_engagement_status(self.id, self.engagement_status_id)
    }
}

/// Tax year joined with its entity, for client listings and access checks.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaxYearWithEntity {
    pub id: DbId,
    pub client_entity_id: DbId,
    pub entity_name: String,
    pub entity_type: String,
    pub account_id: DbId,
    pub tax_year: i32,
    pub internal_status_id: StatusId,
    pub engagement_status_id: StatusId,
    pub documents_confirmed_at: Option<Timestamp>,
    pub efile_authorized_at: Option<Timestamp>,
    pub extension_requested_at: Option<Timestamp>,
}

impl TaxYearWithEntity {
    pub fn status(&self) -> Result<InternalStatus, CoreError> {
        decode_status(self.id, self.internal_status_id)
    }

    pub fn engagement_status(&self) -> Result<EngagementStatus, CoreError> {
        decode_engagement_status(self.id, self.engagement_status_id)
    }
}

/// DTO for creating a tax year. `client_entity_id` comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaxYear {
    pub tax_year: i32,
    pub assigned_staff_id: Option<DbId>,
}

/// DTO for staff edits that are not workflow transitions.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaxYear {
    pub assigned_staff_id: Option<DbId>,
}

fn decode_status(id: DbId, status_id: StatusId) -> Result<InternalStatus, CoreError> {
    InternalStatus::from_id(status_id).ok_or_else(|| {
        CoreError::Internal(format!(
            "Tax year {id} has unknown internal_status_id {status_id}"
        ))
    })
}

fn decode_engagement_status(id: DbId, status_id: StatusId) -> Result<EngagementStatus, CoreError> {
    EngagementStatus::from_id(status_id).ok_or_else(|| {
        CoreError::Internal(format!(
            "Tax year {id} has unknown engagement_status_id {status_id}"
        ))
    })
}
