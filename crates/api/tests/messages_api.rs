//! Integration tests for the per-tax-year message thread.

mod common;

use axum::http::StatusCode;
use common::{expect_data, get_auth, post_json_auth, setup_client_year};
use serde_json::json;
use sqlx::PgPool;

/// Both sides post to the same thread; polling with `after_id` returns only
/// newer messages in order.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_thread_polling(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let cy = setup_client_year(&pool, &app, &["view", "message"]).await;
    let uri = format!("/api/v1/threads/{}/messages", cy.tax_year_id);

    let first = expect_data(
        post_json_auth(
            app.clone(),
            &uri,
            json!({ "body": "  Do you need my 1098 mortgage statement?  " }),
            &cy.client_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(first["body"], "Do you need my 1098 mortgage statement?");
    assert_eq!(first["sender_role"], "client");
    assert_eq!(first["sender_id"], cy.client.id);

    let reply = expect_data(
        post_json_auth(
            app.clone(),
            &uri,
            json!({ "body": "Yes please, upload it under Other documents." }),
            &cy.staff_token,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(reply["sender_role"], "staff");

    let all = expect_data(get_auth(app.clone(), &uri, &cy.client_token).await, StatusCode::OK).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"], first["id"]);
    assert_eq!(all[1]["id"], reply["id"]);

    let first_id = first["id"].as_i64().unwrap();
    let newer = expect_data(
        get_auth(app.clone(), &format!("{uri}?after_id={first_id}"), &cy.client_token).await,
        StatusCode::OK,
    )
    .await;
    let newer = newer.as_array().unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0]["id"], reply["id"]);

    let reply_id = reply["id"].as_i64().unwrap();
    let none = expect_data(
        get_auth(app, &format!("{uri}?after_id={reply_id}"), &cy.client_token).await,
        StatusCode::OK,
    )
    .await;
    assert!(none.as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_blank_message_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let cy = setup_client_year(&pool, &app, &["view", "message"]).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/threads/{}/messages", cy.tax_year_id),
        json!({ "body": "   " }),
        &cy.client_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_messaging_requires_message_permission(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let cy = setup_client_year(&pool, &app, &["view"]).await;
    let uri = format!("/api/v1/threads/{}/messages", cy.tax_year_id);

    let response = get_auth(app.clone(), &uri, &cy.client_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app, &uri, json!({ "body": "Hello" }), &cy.client_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
