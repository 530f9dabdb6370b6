use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxdesk_api::background::session_retention;
use taxdesk_api::config::ServerConfig;
use taxdesk_api::router::build_app_router;
use taxdesk_api::state::AppState;
use taxdesk_api::storage::DocumentStore;
use taxdesk_events::{
    DispatcherConfig, EmailConfig, EmailDelivery, EventBus, EventPersistence, InviteDispatcher,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line for log shipping.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taxdesk_api=debug,taxdesk_events=info,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = taxdesk_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    taxdesk_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    taxdesk_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Document storage ---
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .expect("Failed to create document storage directory");
    let documents = Arc::new(DocumentStore::new(config.storage_dir.clone()));
    tracing::info!(storage_dir = %config.storage_dir.display(), "Document storage ready");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // Spawn event persistence (writes every event to activity_events).
    let persistence_handle = tokio::spawn(EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    // --- Invite dispatcher ---
    let email = EmailConfig::from_env().and_then(|cfg| match EmailDelivery::new(cfg) {
        Ok(delivery) => Some(delivery),
        Err(e) => {
            tracing::error!(error = %e, "Invalid SMTP configuration, invite links will be logged");
            None
        }
    });
    if email.is_none() {
        tracing::warn!("SMTP not configured, invite links will be logged instead of sent");
    }
    let dispatcher = InviteDispatcher::new(
        pool.clone(),
        DispatcherConfig {
            base_url: config.invite_base_url.clone(),
            interval: Duration::from_secs(config.invite_dispatch_interval_secs),
        },
        email,
    );
    let background_cancel = CancellationToken::new();
    let dispatcher_cancel = background_cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    // --- Session retention ---
    let session_retention_days: i64 = std::env::var("SESSION_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(session_retention::DEFAULT_RETENTION_DAYS);
    let retention_handle = tokio::spawn(session_retention::run(
        pool.clone(),
        session_retention_days,
        background_cancel.clone(),
    ));

    tracing::info!(
        "Background services started (event persistence, invite dispatcher, session retention)"
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        documents,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    background_cancel.cancel();
    if tokio::time::timeout(grace, dispatcher_handle).await.is_err() {
        tracing::warn!("Invite dispatcher did not stop in time");
    }
    if tokio::time::timeout(grace, retention_handle).await.is_err() {
        tracing::warn!("Session retention job did not stop in time");
    }

    // Dropping the last sender closes the channel and ends persistence.
    // The router held a clone inside the app state, which is gone by now.
    drop(event_bus);
    if tokio::time::timeout(grace, persistence_handle).await.is_err() {
        tracing::warn!("Event persistence did not drain in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
