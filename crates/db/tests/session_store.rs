//! Integration tests for the refresh-token store.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use taxdesk_db::models::session::CreateSession;
use taxdesk_db::models::user::CreateUser;
use taxdesk_db::repositories::{SessionRepo, UserRepo};

async fn create_session(pool: &PgPool, user_id: i64, hash: &str, ttl: Duration) {
    SessionRepo::create(
        pool,
        &CreateSession {
            user_id,
            refresh_token_hash: hash.to_string(),
            expires_at: Utc::now() + ttl,
            user_agent: None,
            ip_address: None,
        },
    )
    .await
    .unwrap();
}

async fn create_user(pool: &PgPool) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: "sessions@home.test".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Ng".to_string(),
            role_id: 3,
            staff_role_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "./migrations")]
async fn test_consume_is_single_use(pool: PgPool) {
    let user_id = create_user(&pool).await;
    create_session(&pool, user_id, "live", Duration::days(30)).await;
    create_session(&pool, user_id, "stale", Duration::days(-1)).await;

    let session = SessionRepo::consume(&pool, "live").await.unwrap().unwrap();
    assert_eq!(session.user_id, user_id);
    assert!(session.is_revoked);

    assert!(SessionRepo::consume(&pool, "live").await.unwrap().is_none());
    assert!(SessionRepo::consume(&pool, "stale").await.unwrap().is_none());
    assert!(SessionRepo::consume(&pool, "unknown").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_purge_respects_the_cutoff(pool: PgPool) {
    let user_id = create_user(&pool).await;
    create_session(&pool, user_id, "live", Duration::days(30)).await;
    create_session(&pool, user_id, "expired", Duration::days(-1)).await;
    create_session(&pool, user_id, "used", Duration::days(30)).await;
    SessionRepo::consume(&pool, "used").await.unwrap();

    // Only the long-expired row is older than an hour ago.
    let purged = SessionRepo::purge_before(&pool, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    // The revoked row goes once the cutoff passes its revocation.
    let purged = SessionRepo::purge_before(&pool, Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    let live = SessionRepo::consume(&pool, "live").await.unwrap();
    assert!(live.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_revoke_all_for_user(pool: PgPool) {
    let user_id = create_user(&pool).await;
    create_session(&pool, user_id, "phone", Duration::days(30)).await;
    create_session(&pool, user_id, "laptop", Duration::days(30)).await;

    assert_eq!(SessionRepo::revoke_all_for_user(&pool, user_id).await.unwrap(), 2);
    assert_eq!(SessionRepo::revoke_all_for_user(&pool, user_id).await.unwrap(), 0);
    assert!(SessionRepo::consume(&pool, "phone").await.unwrap().is_none());
}
