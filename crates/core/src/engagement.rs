//! Engagement letter signing rules.
//!
//! A tax year names the users who must sign its engagement letter. The
//! engagement status is derived from which of them have signed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, StatusId};
use crate::workflow::InternalStatus;

/// Minimum length of a typed signature after trimming.
pub const MIN_SIGNATURE_NAME_LENGTH: usize = 2;

/// Maximum length of a typed signature.
pub const MAX_SIGNATURE_NAME_LENGTH: usize = 200;

/// Signing progress of a tax year's engagement letter.
///
/// Discriminants match the seed order of the `engagement_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementStatus {
    NotStarted = 1,
    PartiallySigned = 2,
    FullySigned = 3,
}

impl EngagementStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::NotStarted),
            2 => Some(Self::PartiallySigned),
            3 => Some(Self::FullySigned),
            _ => None,
        }
    }
}

/// Derive the engagement status from the required signers and the users who
/// have signed so far.
///
/// Signatures from users who are not required signers are ignored. A letter
/// with no required signers has not started.
pub fn derive_engagement_status(required: &[DbId], signed: &[DbId]) -> EngagementStatus {
    if required.is_empty() {
        return EngagementStatus::NotStarted;
    }

    let signed_required = required.iter().filter(|id| signed.contains(id)).count();

    if signed_required == 0 {
        EngagementStatus::NotStarted
    } else if signed_required == required.len() {
        EngagementStatus::FullySigned
    } else {
        EngagementStatus::PartiallySigned
    }
}

/// Validate that `signer` may sign the engagement letter now.
pub fn check_can_sign(
    status: InternalStatus,
    signer: DbId,
    required: &[DbId],
    signed: &[DbId],
) -> Result<(), CoreError> {
    if status != InternalStatus::SignEngagement {
        return Err(CoreError::Conflict(format!(
            "The engagement letter is not open for signing while the tax year is in {status}"
        )));
    }
    if !required.contains(&signer) {
        return Err(CoreError::Forbidden(
            "You are not a required signer of this engagement letter".into(),
        ));
    }
    if signed.contains(&signer) {
        return Err(CoreError::Conflict(
            "You have already signed this engagement letter".into(),
        ));
    }
    Ok(())
}

/// Validate a typed signature and return it trimmed.
pub fn validate_signature_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_SIGNATURE_NAME_LENGTH || len > MAX_SIGNATURE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Signature must be between {MIN_SIGNATURE_NAME_LENGTH} and \
             {MAX_SIGNATURE_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_ids_match_seed_data() {
        assert_eq!(EngagementStatus::NotStarted.id(), 1);
        assert_eq!(EngagementStatus::PartiallySigned.id(), 2);
        assert_eq!(EngagementStatus::FullySigned.id(), 3);
        assert_eq!(EngagementStatus::from_id(4), None);
    }

    #[test]
    fn no_required_signers_is_not_started() {
        assert_eq!(
            derive_engagement_status(&[], &[1, 2]),
            EngagementStatus::NotStarted
        );
    }

    #[test]
    fn partial_and_full_signing() {
        let required = [10, 11];
        assert_eq!(
            derive_engagement_status(&required, &[]),
            EngagementStatus::NotStarted
        );
        assert_eq!(
            derive_engagement_status(&required, &[10]),
            EngagementStatus::PartiallySigned
        );
        assert_eq!(
            derive_engagement_status(&required, &[11, 10]),
            EngagementStatus::FullySigned
        );
    }

    #[test]
    fn outside_signatures_do_not_count() {
        assert_eq!(
            derive_engagement_status(&[10], &[99]),
            EngagementStatus::NotStarted
        );
    }

    #[test]
    fn signing_rules() {
        let stage = InternalStatus::SignEngagement;
        assert!(check_can_sign(stage, 1, &[1, 2], &[]).is_ok());
        assert_matches!(
            check_can_sign(stage, 3, &[1, 2], &[]),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_can_sign(stage, 1, &[1, 2], &[1]),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            check_can_sign(InternalStatus::InReview, 1, &[1], &[]),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn signature_name_is_trimmed_and_bounded() {
        assert_eq!(validate_signature_name("  Jane Doe ").unwrap(), "Jane Doe");
        assert!(validate_signature_name(" J ").is_err());
        assert!(validate_signature_name(&"x".repeat(201)).is_err());
    }
}
