//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod account;
pub mod activity_event;
pub mod checklist;
pub mod client_entity;
pub mod document;
pub mod engagement;
pub mod invite;
pub mod message;
pub mod permission;
pub mod questionnaire;
pub mod role;
pub mod session;
pub mod staff_role;
pub mod tax_year;
pub mod user;
