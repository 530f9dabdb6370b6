//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate persistence to the repositories in `taxdesk_db`,
//! workflow rules to `taxdesk_core`, and map failures through [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod checklist;
pub mod client;
pub mod documents;
pub mod engagement;
pub mod entities;
pub mod invites;
pub mod messages;
pub mod milestones;
pub mod permissions;
pub mod questionnaire;
pub mod staff_roles;
pub mod tax_years;
