//! HTTP-level integration tests for the auth and admin endpoints.
//!
//! Tests cover login, token refresh, logout, role enforcement, admin user
//! management, and account lockout.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_user, get, get_auth, login, post_json, post_json_auth, ROLE_ADMIN_ID,
    ROLE_CLIENT_ID, ROLE_STAFF_ID, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;
use taxdesk_api::background::session_retention;
use taxdesk_db::repositories::UserRepo;

// ---------------------------------------------------------------------------
// Login, refresh and logout
// ---------------------------------------------------------------------------

/// Successful login returns tokens plus the user's profile.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let user = create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "Owner@Firm.test ", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert!(json["expires_in"].is_number());
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["email"], "owner@firm.test");
    assert_eq!(json["user"]["role"], "admin");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    create_user(&pool, "staff@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "staff@firm.test", "password": "not-the-password" });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_unknown_email(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = json!({ "email": "nobody@firm.test", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_inactive_user(pool: PgPool) {
    let user = create_user(&pool, "gone@firm.test", ROLE_STAFF_ID).await;
    UserRepo::deactivate(&pool, user.id).await.unwrap();
    let app = common::build_test_app(pool);

    let body = json!({ "email": "gone@firm.test", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// A refresh token is single-use: the rotated token works, the old one does not.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_token_refresh_rotates(pool: PgPool) {
    create_user(&pool, "client@home.test", ROLE_CLIENT_ID).await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "client@home.test", "password": TEST_PASSWORD });
    let login_json = body_json(post_json(app.clone(), "/api/v1/auth/login", body).await).await;
    let refresh_token = login_json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_ne!(json["refresh_token"].as_str().unwrap(), refresh_token);
    assert_eq!(json["user"]["role"], "client");

    let replay = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_logout_revokes_refresh_tokens(pool: PgPool) {
    create_user(&pool, "staff@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "staff@firm.test", "password": TEST_PASSWORD });
    let login_json = body_json(post_json(app.clone(), "/api/v1/auth/login", body).await).await;
    let access = login_json["access_token"].as_str().unwrap();
    let refresh = login_json["refresh_token"].as_str().unwrap();

    let response = post_json_auth(app.clone(), "/api/v1/auth/logout", json!({}), access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(app, "/api/v1/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_me_returns_profile(pool: PgPool) {
    let user = create_user(&pool, "client@home.test", ROLE_CLIENT_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "client@home.test").await;

    let response = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], user.id);
    assert_eq!(json["data"]["role"], "client");
    assert!(json["data"].get("password_hash").is_none());
}

// ---------------------------------------------------------------------------
// Role enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_endpoint_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/admin/users").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_endpoint_rejects_staff(pool: PgPool) {
    create_user(&pool, "staff@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "staff@firm.test").await;

    let response = get_auth(app, "/api/v1/admin/users", &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Clients cannot reach firm-side record management.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_staff_endpoint_rejects_client(pool: PgPool) {
    create_user(&pool, "client@home.test", ROLE_CLIENT_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "client@home.test").await;

    let response = get_auth(app, "/api/v1/accounts", &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Admin user management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_create_user(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;

    let body = json!({
        "email": "new.preparer@firm.test",
        "password": "a-long-enough-password",
        "first_name": "Dana",
        "last_name": "Okafor",
        "role_id": ROLE_STAFF_ID,
        "staff_role_id": 1
    });
    let response = post_json_auth(app.clone(), "/api/v1/admin/users", body, &token).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "new.preparer@firm.test");
    assert_eq!(json["data"]["role"], "staff");
    assert_eq!(json["data"]["staff_role_id"], 1);
    assert!(json["data"]["is_active"].as_bool().unwrap());

    let duplicate = json!({
        "email": "new.preparer@firm.test",
        "password": "a-long-enough-password",
        "first_name": "Dana",
        "last_name": "Okafor",
        "role_id": ROLE_STAFF_ID
    });
    let response = post_json_auth(app, "/api/v1/admin/users", duplicate, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_create_user_rejects_short_password(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;

    let body = json!({
        "email": "weak@firm.test",
        "password": "short",
        "first_name": "Weak",
        "last_name": "Password",
        "role_id": ROLE_STAFF_ID
    });
    let response = post_json_auth(app, "/api/v1/admin/users", body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_admin_list_users(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    create_user(&pool, "staff@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;

    let response = get_auth(app, "/api/v1/admin/users", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let users = json["data"].as_array().expect("data should be an array");
    assert_eq!(users.len(), 2);
}

/// After five failed attempts the account is locked, even for the right password.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_account_lockout(pool: PgPool) {
    create_user(&pool, "lockme@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let body = json!({ "email": "lockme@firm.test", "password": "wrong-password" });
        let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let body = json!({ "email": "lockme@firm.test", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    let error_msg = json["error"].as_str().unwrap_or("");
    assert!(error_msg.contains("locked"), "got: {error_msg}");
}

/// Once a lock expires the user gets a fresh set of attempts.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_expired_lock_restarts_the_count(pool: PgPool) {
    let user = create_user(&pool, "relock@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool.clone());
    let wrong = json!({ "email": "relock@firm.test", "password": "wrong-password" });

    for _ in 0..5 {
        let response = post_json(app.clone(), "/api/v1/auth/login", wrong.clone()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    sqlx::query(
        "UPDATE users SET locked_until = NOW() - INTERVAL '1 minute', failed_login_count = 5
         WHERE id = $1",
    )
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();

    let response = post_json(app.clone(), "/api/v1/auth/login", wrong).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (count, locked): (i32, bool) = sqlx::query_as(
        "SELECT failed_login_count, locked_until IS NOT NULL FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
    assert!(!locked);

    let body = json!({ "email": "relock@firm.test", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Two refreshes racing on one token: exactly one gets a new pair.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_concurrent_refresh_has_one_winner(pool: PgPool) {
    create_user(&pool, "racer@home.test", ROLE_CLIENT_ID).await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "racer@home.test", "password": TEST_PASSWORD });
    let login_json = body_json(post_json(app.clone(), "/api/v1/auth/login", body).await).await;
    let refresh = json!({ "refresh_token": login_json["refresh_token"] });

    let (first, second) = tokio::join!(
        post_json(app.clone(), "/api/v1/auth/refresh", refresh.clone()),
        post_json(app, "/api/v1/auth/refresh", refresh),
    );
    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 401]);
}

/// The retention job drops used refresh tokens and leaves the live one.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_retention_purges_used_tokens(pool: PgPool) {
    create_user(&pool, "keeper@home.test", ROLE_CLIENT_ID).await;
    let app = common::build_test_app(pool.clone());

    let body = json!({ "email": "keeper@home.test", "password": TEST_PASSWORD });
    let login_json = body_json(post_json(app.clone(), "/api/v1/auth/login", body).await).await;
    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": login_json["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await["refresh_token"].clone();

    let purged = session_retention::purge(&pool, 0).await.unwrap();
    assert_eq!(purged, 1);

    let response = post_json(app, "/api/v1/auth/refresh", json!({ "refresh_token": rotated })).await;
    assert_eq!(response.status(), StatusCode::OK);
}
