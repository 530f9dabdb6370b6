//! Taxdesk domain core.
//!
//! Pure business rules shared by the persistence and HTTP layers. Nothing in
//! this crate performs I/O; callers load the facts and pass them in.

pub mod documents;
pub mod engagement;
pub mod entity_types;
pub mod error;
pub mod hashing;
pub mod invites;
pub mod permissions;
pub mod questionnaire;
pub mod roles;
pub mod types;
pub mod workflow;
