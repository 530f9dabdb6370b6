//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that take a
//! [`DbTx`](crate::DbTx) participate in a caller-owned transaction.

pub mod account_repo;
pub mod activity_event_repo;
pub mod checklist_repo;
pub mod client_entity_repo;
pub mod document_repo;
pub mod engagement_repo;
pub mod invite_repo;
pub mod message_repo;
pub mod permission_repo;
pub mod questionnaire_repo;
pub mod role_repo;
pub mod session_repo;
pub mod staff_role_repo;
pub mod tax_year_repo;
pub mod user_repo;

pub use account_repo::AccountRepo;
pub use activity_event_repo::ActivityEventRepo;
pub use checklist_repo::ChecklistRepo;
pub use client_entity_repo::ClientEntityRepo;
pub use document_repo::DocumentRepo;
pub use engagement_repo::EngagementRepo;
pub use invite_repo::InviteRepo;
pub use message_repo::MessageRepo;
pub use permission_repo::PermissionRepo;
pub use questionnaire_repo::QuestionnaireRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use staff_role_repo::StaffRoleRepo;
pub use tax_year_repo::TaxYearRepo;
pub use user_repo::UserRepo;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 200;

/// Clamp a caller-supplied limit into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Clamp a caller-supplied offset to be non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
