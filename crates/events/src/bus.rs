//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DomainEvent`]s. Share it
//! via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taxdesk_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event type names
// ---------------------------------------------------------------------------

pub const EVENT_ENGAGEMENT_SIGNED: &str = "engagement.signed";
pub const EVENT_STATUS_CHANGED: &str = "tax_year.status_changed";
pub const EVENT_DOCUMENT_UPLOADED: &str = "document.uploaded";
pub const EVENT_DOCUMENT_DELETED: &str = "document.deleted";
pub const EVENT_DOCUMENTS_CONFIRMED: &str = "documents.confirmed";
pub const EVENT_EFILE_AUTHORIZED: &str = "efile.authorized";
pub const EVENT_EXTENSION_REQUESTED: &str = "extension.requested";
pub const EVENT_MESSAGE_POSTED: &str = "message.posted";
pub const EVENT_QUESTIONNAIRE_ANSWERED: &str = "questionnaire.answered";
pub const EVENT_INVITE_QUEUED: &str = "invite.queued";
pub const EVENT_INVITE_ACCEPTED: &str = "invite.accepted";

/// Source kind for events about a tax year.
pub const SOURCE_TAX_YEAR: &str = "entity_tax_year";
/// Source kind for events about an invite.
pub const SOURCE_INVITE: &str = "invite";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened to a tax year, an invite or a thread.
///
/// Built with [`DomainEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"engagement.signed"`.
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for an event whose source is a tax year.
    pub fn for_tax_year(event_type: impl Into<String>, tax_year_id: DbId) -> Self {
        Self::new(event_type).with_source(SOURCE_TAX_YEAR, tax_year_id)
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest unconsumed events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(event_type = %event.event_type, source_id = ?event.source_entity_id, "Publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            DomainEvent::for_tax_year(EVENT_ENGAGEMENT_SIGNED, 42)
                .with_actor(7)
                .with_payload(serde_json::json!({"engagement_status": "FULLY_SIGNED"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "engagement.signed");
        assert_eq!(received.source_entity_type.as_deref(), Some(SOURCE_TAX_YEAR));
        assert_eq!(received.source_entity_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload["engagement_status"], "FULLY_SIGNED");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DomainEvent::new(EVENT_INVITE_QUEUED));

        assert_eq!(rx1.recv().await.unwrap().event_type, EVENT_INVITE_QUEUED);
        assert_eq!(rx2.recv().await.unwrap().event_type, EVENT_INVITE_QUEUED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(DomainEvent::new("orphan.event"));
    }

    #[test]
    fn bare_event_has_empty_payload() {
        let event = DomainEvent::new(EVENT_MESSAGE_POSTED);
        assert!(event.source_entity_type.is_none());
        assert!(event.actor_user_id.is_none());
        assert!(event.payload.is_object());
    }
}
