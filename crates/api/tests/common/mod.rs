#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use taxdesk_api::auth::jwt::JwtConfig;
use taxdesk_api::auth::password::hash_password;
use taxdesk_api::config::ServerConfig;
use taxdesk_api::router::build_app_router;
use taxdesk_api::state::AppState;
use taxdesk_api::storage::DocumentStore;
use taxdesk_core::types::DbId;
use taxdesk_db::models::user::{CreateUser, User};
use taxdesk_db::repositories::UserRepo;
use taxdesk_events::EventBus;

/// Seeded role ids.
pub const ROLE_ADMIN_ID: DbId = 1;
pub const ROLE_STAFF_ID: DbId = 2;
pub const ROLE_CLIENT_ID: DbId = 3;

/// Password given to every user created by [`create_user`].
pub const TEST_PASSWORD: &str = "correct-horse-battery-42";

const MULTIPART_BOUNDARY: &str = "taxdesk-test-boundary";

/// Build a test `ServerConfig` with a fresh document directory.
pub fn test_config() -> ServerConfig {
    let storage_dir =
        std::env::temp_dir().join(format!("taxdesk-test-{}", uuid::Uuid::new_v4().simple()));
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        storage_dir,
        max_upload_bytes: 1024 * 1024,
        invite_base_url: "http://localhost:5173".to_string(),
        invite_dispatch_interval_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Build the full application router on `pool`, using the same middleware
/// stack as production.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        documents: Arc::new(DocumentStore::new(config.storage_dir.clone())),
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, json_request(Method::GET, uri, None, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, json_request(Method::GET, uri, Some(token), None)).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), Some(body))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), None)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, json_request(Method::DELETE, uri, Some(token), None)).await
}

/// POST a multipart upload with the given text fields and one file part.
pub async fn post_upload(
    app: Router,
    token: &str,
    fields: &[(&str, String)],
    filename: &str,
    data: &[u8],
) -> Response<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/documents/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Assert the status and return the `data` field of the envelope.
pub async fn expect_data(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user directly with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role_id: DbId) -> User {
    let input = CreateUser {
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role_id,
        staff_role_id: None,
    };
    UserRepo::create(pool, &input).await.unwrap()
}

/// Log in through the API and return the access token.
pub async fn login(app: Router, email: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// One client household with a tax year, built through the staff API.
pub struct ClientYear {
    pub staff_token: String,
    pub client: User,
    pub client_token: String,
    pub account_id: DbId,
    pub entity_id: DbId,
    pub tax_year_id: DbId,
}

/// Create a staff user, an account with one client member, an entity the
/// client holds `permissions` on, and a 2025 tax year.
pub async fn setup_client_year(pool: &PgPool, app: &Router, permissions: &[&str]) -> ClientYear {
    create_user(pool, "preparer@firm.test", ROLE_STAFF_ID).await;
    let client = create_user(pool, "client@home.test", ROLE_CLIENT_ID).await;
    let staff_token = login(app.clone(), "preparer@firm.test").await;
    let client_token = login(app.clone(), "client@home.test").await;

    let account = expect_data(
        post_json_auth(
            app.clone(),
            "/api/v1/accounts",
            json!({ "name": "Rivera Household" }),
            &staff_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let account_id = account["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/accounts/{account_id}/users"),
        json!({ "user_id": client.id, "is_primary": true }),
        &staff_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let entity = expect_data(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/accounts/{account_id}/entities"),
            json!({ "name": "Rivera Family", "entity_type": "household" }),
            &staff_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let entity_id = entity["id"].as_i64().unwrap();

    let year = expect_data(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/entities/{entity_id}/tax-years"),
            json!({ "tax_year": 2025 }),
            &staff_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let tax_year_id = year["id"].as_i64().unwrap();

    if !permissions.is_empty() {
        grant(app, &staff_token_admin(pool, app).await, account_id, client.id, entity_id, permissions)
            .await;
    }

    ClientYear {
        staff_token,
        client,
        client_token,
        account_id,
        entity_id,
        tax_year_id,
    }
}

/// Log in as the seeded test admin, creating it on first use.
pub async fn staff_token_admin(pool: &PgPool, app: &Router) -> String {
    let email = "admin@firm.test";
    if UserRepo::find_by_email(pool, email).await.unwrap().is_none() {
        create_user(pool, email, ROLE_ADMIN_ID).await;
    }
    login(app.clone(), email).await
}

/// Replace the account ACL with a single entry.
pub async fn grant(
    app: &Router,
    admin_token: &str,
    account_id: DbId,
    user_id: DbId,
    entity_id: DbId,
    permissions: &[&str],
) {
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/permissions/client/{account_id}/acl"),
        json!({
            "entries": [{
                "user_id": user_id,
                "client_entity_id": entity_id,
                "permissions": permissions,
            }]
        }),
        admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Add a required checklist item to a tax year.
pub async fn add_checklist_item(app: &Router, staff_token: &str, tax_year_id: DbId, label: &str) -> DbId {
    let item = expect_data(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/tax-years/{tax_year_id}/checklist"),
            json!({ "label": label }),
            staff_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    item["id"].as_i64().unwrap()
}

/// Make `user_ids` the engagement signers.
pub async fn set_signers(app: &Router, staff_token: &str, tax_year_id: DbId, user_ids: &[DbId]) {
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/tax-years/{tax_year_id}/signers"),
        json!({ "user_ids": user_ids }),
        staff_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Current internal status code of a tax year, read through the staff API.
pub async fn status_of(app: &Router, staff_token: &str, tax_year_id: DbId) -> String {
    let year = expect_data(
        get_auth(app.clone(), &format!("/api/v1/tax-years/{tax_year_id}"), staff_token).await,
        StatusCode::OK,
    )
    .await;
    year["status"].as_str().unwrap().to_string()
}
