use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::DocumentStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: taxdesk_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// On-disk store for uploaded client documents.
    pub documents: Arc<DocumentStore>,
    /// Event bus for workflow and activity events.
    pub event_bus: Arc<taxdesk_events::EventBus>,
}
