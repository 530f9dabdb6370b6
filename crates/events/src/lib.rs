//! Taxdesk event bus and outbound delivery.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] -- the event envelope published by workflow handlers.
//! - [`EventPersistence`] -- background service writing every event to
//!   `activity_events`.
//! - [`delivery`] -- SMTP email delivery.
//! - [`InviteDispatcher`] -- periodic sender for queued client invites.

pub mod bus;
pub mod delivery;
pub mod invite_dispatcher;
pub mod persistence;

pub use bus::{DomainEvent, EventBus};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use invite_dispatcher::{issue_invite_token, DispatcherConfig, InviteDispatcher};
pub use persistence::EventPersistence;
