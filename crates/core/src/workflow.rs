//! Client tax-year status workflow.
//!
//! Every entity tax year moves through six strictly ordered stages:
//!
//! ```text
//! SIGN_ENGAGEMENT -> UPLOAD_DOCUMENTS -> CONFIRM_DOCUMENTS -> IN_REVIEW -> SIGN_EFILE -> FILED
//! ```
//!
//! The first three moves are driven by the client (signing, uploading,
//! confirming); the last two by the firm. This module owns the stage table
//! shown to clients and the rules for which moves are legal. Callers load a
//! [`TaxYearFacts`] snapshot and ask; nothing here touches the database.

use serde::{Deserialize, Serialize};

use crate::engagement::EngagementStatus;
use crate::error::CoreError;
use crate::types::StatusId;

// ---------------------------------------------------------------------------
// InternalStatus
// ---------------------------------------------------------------------------

/// Persisted workflow stage of an entity tax year.
///
/// Discriminants match the seed order of the `internal_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
    SignEngagement = 1,
    UploadDocuments = 2,
    ConfirmDocuments = 3,
    InReview = 4,
    SignEfile = 5,
    Filed = 6,
}

/// Every stage, in workflow order.
pub const ALL_STATUSES: [InternalStatus; 6] = [
    InternalStatus::SignEngagement,
    InternalStatus::UploadDocuments,
    InternalStatus::ConfirmDocuments,
    InternalStatus::InReview,
    InternalStatus::SignEfile,
    InternalStatus::Filed,
];

impl InternalStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a stage by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        ALL_STATUSES.iter().copied().find(|s| s.id() == id)
    }

    /// Stable wire code, e.g. `"SIGN_ENGAGEMENT"`.
    pub fn code(self) -> &'static str {
        match self {
            Self::SignEngagement => "SIGN_ENGAGEMENT",
            Self::UploadDocuments => "UPLOAD_DOCUMENTS",
            Self::ConfirmDocuments => "CONFIRM_DOCUMENTS",
            Self::InReview => "IN_REVIEW",
            Self::SignEfile => "SIGN_EFILE",
            Self::Filed => "FILED",
        }
    }

    /// Parse a wire code back into a stage.
    pub fn from_code(code: &str) -> Option<Self> {
        ALL_STATUSES.iter().copied().find(|s| s.code() == code)
    }

    /// The stage that follows this one, or `None` for `FILED`.
    pub fn next(self) -> Option<Self> {
        Self::from_id(self.id() + 1)
    }

    /// `FILED` is the only terminal stage.
    pub fn is_terminal(self) -> bool {
        self == Self::Filed
    }

    /// Stages the client advances by their own actions.
    fn is_client_driven_target(self) -> bool {
        matches!(
            self,
            Self::UploadDocuments | Self::ConfirmDocuments | Self::InReview
        )
    }
}

impl std::fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Everything the workflow rules need to know about one tax year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxYearFacts {
    /// The persisted stage.
    pub current: InternalStatus,
    pub engagement: EngagementStatus,
    /// Every required, applicable checklist item has at least one document.
    pub required_items_satisfied: bool,
    pub documents_confirmed: bool,
    pub efile_authorized: bool,
    pub extension_requested: bool,
}

// ---------------------------------------------------------------------------
// Stage presentation
// ---------------------------------------------------------------------------

/// A block of the client app's tax-year screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSection {
    Engagement,
    Documents,
    DocumentConfirmation,
    Questionnaire,
    Messages,
    EfileAuthorization,
    Extension,
}

/// What the client sees for a given stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub status: InternalStatus,
    /// 1-based position of the stage in the workflow.
    pub step: u8,
    pub total_steps: u8,
    pub title: &'static str,
    pub description: &'static str,
    pub sections: Vec<ClientSection>,
}

/// Map a persisted stage to the title, description and visible sections of
/// the client screen.
pub fn stage_view(status: InternalStatus, facts: &TaxYearFacts) -> StageView {
    use ClientSection::*;

    let (title, description, mut sections) = match status {
        InternalStatus::SignEngagement => {
            let description = if facts.engagement == EngagementStatus::PartiallySigned {
                "Your signature is recorded. We are waiting on the remaining signers \
                 before work can begin."
            } else {
                "Review and sign the engagement letter so we can begin work on your return."
            };
            (
                "Sign your engagement letter",
                description,
                vec![Engagement, Questionnaire, Messages],
            )
        }
        InternalStatus::UploadDocuments => (
            "Upload your documents",
            "Upload the documents on your checklist. Mark any item that does not apply \
             to you this year.",
            vec![Documents, Questionnaire, Messages],
        ),
        InternalStatus::ConfirmDocuments => (
            "Confirm your documents",
            "Review your uploaded documents and confirm they are complete so we can \
             start preparing your return.",
            vec![Documents, DocumentConfirmation, Questionnaire, Messages],
        ),
        InternalStatus::InReview => (
            "Your return is in review",
            "Our team is preparing your return. We will message you if we need anything \
             else.",
            vec![Documents, Questionnaire, Messages],
        ),
        InternalStatus::SignEfile if facts.efile_authorized => (
            "E-file authorization received",
            "Thank you. We will file your return shortly.",
            vec![Documents, Questionnaire, Messages],
        ),
        InternalStatus::SignEfile => (
            "Sign your e-file authorization",
            "Review your return and sign the e-file authorization so we can file \
             electronically.",
            vec![EfileAuthorization, Documents, Questionnaire, Messages],
        ),
        InternalStatus::Filed => (
            "Your return has been filed",
            "Your return was filed. Your documents remain available here.",
            vec![Documents, Messages],
        ),
    };

    if !status.is_terminal() && !facts.extension_requested {
        sections.push(Extension);
    }

    StageView {
        status,
        step: status.id() as u8,
        total_steps: ALL_STATUSES.len() as u8,
        title,
        description,
        sections,
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// The stage the facts imply.
///
/// Once documents are confirmed the firm drives the stage, so a tax year
/// already at `SIGN_EFILE` or `FILED` keeps its persisted stage.
pub fn derive_status(facts: &TaxYearFacts) -> InternalStatus {
    if facts.engagement != EngagementStatus::FullySigned {
        InternalStatus::SignEngagement
    } else if facts.documents_confirmed {
        facts.current.max(InternalStatus::InReview)
    } else if facts.required_items_satisfied {
        InternalStatus::ConfirmDocuments
    } else {
        InternalStatus::UploadDocuments
    }
}

/// Stages a tax year in the client-driven prefix should pass through so its
/// persisted stage agrees with the facts.
///
/// Forward moves are returned one stage at a time and stop at
/// `CONFIRM_DOCUMENTS`, since confirming is an explicit client action.
/// A backward move (a document was removed, a signer was added) is a single
/// entry. Tax years already in review or later are left alone.
pub fn reconcile(facts: &TaxYearFacts) -> Vec<InternalStatus> {
    let current = facts.current;
    if current >= InternalStatus::InReview {
        return Vec::new();
    }

    let target = derive_status(facts).min(InternalStatus::ConfirmDocuments);

    if target > current {
        ALL_STATUSES
            .iter()
            .copied()
            .filter(|s| *s > current && *s <= target)
            .collect()
    } else if target < current {
        vec![target]
    } else {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Transition rules
// ---------------------------------------------------------------------------

/// Validate a move made by the client.
pub fn check_client_transition(
    from: InternalStatus,
    to: InternalStatus,
    facts: &TaxYearFacts,
) -> Result<(), CoreError> {
    if from.next() != Some(to) {
        return Err(CoreError::InvalidTransition { from, to });
    }

    match to {
        InternalStatus::UploadDocuments if facts.engagement != EngagementStatus::FullySigned => {
            Err(CoreError::Conflict(
                "The engagement letter must be signed by every required signer".into(),
            ))
        }
        InternalStatus::ConfirmDocuments | InternalStatus::InReview
            if !facts.required_items_satisfied =>
        {
            Err(CoreError::Conflict(
                "Every required checklist item needs a document or must be marked not applicable"
                    .into(),
            ))
        }
        InternalStatus::UploadDocuments
        | InternalStatus::ConfirmDocuments
        | InternalStatus::InReview => Ok(()),
        _ => Err(CoreError::Conflict(format!(
            "{to} is set by the firm, not by the client"
        ))),
    }
}

/// Validate a move made by firm staff.
///
/// Staff may reopen a tax year to any earlier stage, or advance it one
/// firm-driven stage at a time.
pub fn check_staff_transition(
    from: InternalStatus,
    to: InternalStatus,
    facts: &TaxYearFacts,
) -> Result<(), CoreError> {
    if from == to {
        return Err(CoreError::Validation(format!("Tax year is already in {to}")));
    }
    if to < from {
        return Ok(());
    }
    if from.next() != Some(to) {
        return Err(CoreError::InvalidTransition { from, to });
    }
    if to.is_client_driven_target() {
        return Err(CoreError::Conflict(format!(
            "{to} is reached by client action"
        )));
    }
    if to == InternalStatus::Filed && !facts.efile_authorized {
        return Err(CoreError::Conflict(
            "The client has not signed the e-file authorization".into(),
        ));
    }
    Ok(())
}

/// Validate an e-file authorization signature.
pub fn check_efile_authorization(
    status: InternalStatus,
    already_authorized: bool,
) -> Result<(), CoreError> {
    if status != InternalStatus::SignEfile {
        return Err(CoreError::Conflict(format!(
            "E-file authorization is not open while the tax year is in {status}"
        )));
    }
    if already_authorized {
        return Err(CoreError::Conflict(
            "E-file authorization has already been signed".into(),
        ));
    }
    Ok(())
}

/// Validate an extension request.
pub fn check_extension_request(
    status: InternalStatus,
    already_requested: bool,
) -> Result<(), CoreError> {
    if status.is_terminal() {
        return Err(CoreError::Conflict(
            "The return has already been filed".into(),
        ));
    }
    if already_requested {
        return Err(CoreError::Conflict(
            "An extension has already been requested".into(),
        ));
    }
    Ok(())
}
