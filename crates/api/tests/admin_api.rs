//! HTTP-level integration tests for staff titles and admin user management.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_user, delete_auth, expect_data, get_auth, login, post_json,
    post_json_auth, put_json_auth, ROLE_ADMIN_ID, ROLE_STAFF_ID, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

/// Log in and return the access and refresh tokens.
async fn login_pair(app: &axum::Router, email: &str, password: &str) -> (String, String) {
    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn refresh_status(app: &axum::Router, refresh_token: &str) -> StatusCode {
    post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await
    .status()
}

// ---------------------------------------------------------------------------
// Staff roles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_staff_role_crud(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;

    let seeded = expect_data(get_auth(app.clone(), "/api/v1/staff-roles", &token).await, StatusCode::OK).await;
    let names: Vec<&str> = seeded
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"preparer"));

    let response = post_json_auth(app.clone(), "/api/v1/staff-roles", json!({ "name": " " }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let created = expect_data(
        post_json_auth(
            app.clone(),
            "/api/v1/staff-roles",
            json!({ "name": "bookkeeper", "description": "Keeps the books" }),
            &token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/staff-roles",
        json!({ "name": "bookkeeper" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let updated = expect_data(
        put_json_auth(
            app.clone(),
            &format!("/api/v1/staff-roles/{id}"),
            json!({ "description": "Monthly bookkeeping" }),
            &token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["name"], "bookkeeper");
    assert_eq!(updated["description"], "Monthly bookkeeping");

    let response = delete_auth(app.clone(), &format!("/api/v1/staff-roles/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete_auth(app, &format!("/api/v1/staff-roles/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_staff_roles_are_admin_only(pool: PgPool) {
    create_user(&pool, "preparer@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "preparer@firm.test").await;

    let response = get_auth(app.clone(), "/api/v1/staff-roles", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app, "/api/v1/staff-roles", json!({ "name": "intern" }), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_user_and_deactivate_through_update(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let staff = create_user(&pool, "preparer@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;
    let (_, staff_refresh) = login_pair(&app, "preparer@firm.test", TEST_PASSWORD).await;
    let uri = format!("/api/v1/admin/users/{}", staff.id);

    let updated = expect_data(
        put_json_auth(
            app.clone(),
            &uri,
            json!({ "first_name": "Dana", "staff_role_id": 2 }),
            &token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["first_name"], "Dana");
    assert_eq!(updated["last_name"], "User");
    assert_eq!(updated["staff_role_id"], 2);

    let response = put_json_auth(app.clone(), &uri, json!({ "last_name": "  " }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let deactivated = expect_data(
        put_json_auth(app.clone(), &uri, json!({ "is_active": false }), &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(deactivated["is_active"], false);
    assert_eq!(refresh_status(&app, &staff_refresh).await, StatusCode::UNAUTHORIZED);

    let response = put_json_auth(
        app,
        "/api/v1/admin/users/999999",
        json!({ "first_name": "Nobody" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_deactivate_user_ends_sessions(pool: PgPool) {
    let owner = create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let staff = create_user(&pool, "preparer@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;
    let (_, staff_refresh) = login_pair(&app, "preparer@firm.test", TEST_PASSWORD).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/admin/users/{}", staff.id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(refresh_status(&app, &staff_refresh).await, StatusCode::UNAUTHORIZED);
    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "preparer@firm.test", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.clone(), &format!("/api/v1/admin/users/{}", owner.id), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete_auth(app, "/api/v1/admin/users/999999", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reset_password(pool: PgPool) {
    create_user(&pool, "owner@firm.test", ROLE_ADMIN_ID).await;
    let staff = create_user(&pool, "preparer@firm.test", ROLE_STAFF_ID).await;
    let app = common::build_test_app(pool);
    let token = login(app.clone(), "owner@firm.test").await;
    let (_, old_refresh) = login_pair(&app, "preparer@firm.test", TEST_PASSWORD).await;
    let uri = format!("/api/v1/admin/users/{}/reset-password", staff.id);

    let response = post_json_auth(app.clone(), &uri, json!({ "new_password": "short" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "new_password": "a-fresh-long-passphrase" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(refresh_status(&app, &old_refresh).await, StatusCode::UNAUTHORIZED);
    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "preparer@firm.test", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    login_pair(&app, "preparer@firm.test", "a-fresh-long-passphrase").await;
}
