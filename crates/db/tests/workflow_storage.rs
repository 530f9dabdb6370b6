//! Integration tests for the transactional workflow writes, invites and
//! message threads.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use taxdesk_core::engagement::EngagementStatus;
use taxdesk_core::invites::{INVITE_QUEUED, INVITE_REVOKED, INVITE_SENT};
use taxdesk_core::workflow::InternalStatus;
use taxdesk_db::models::account::CreateAccount;
use taxdesk_db::models::client_entity::CreateClientEntity;
use taxdesk_db::models::engagement::CreateSignature;
use taxdesk_db::models::invite::CreateInvite;
use taxdesk_db::models::tax_year::{CreateTaxYear, EntityTaxYear};
use taxdesk_db::models::user::CreateUser;
use taxdesk_db::repositories::{
    AccountRepo, ClientEntityRepo, EngagementRepo, InviteRepo, MessageRepo, TaxYearRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_user(pool: &PgPool, email: &str, role_id: i64) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Doe".to_string(),
            role_id,
            staff_role_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn create_tax_year(pool: &PgPool) -> (i64, EntityTaxYear) {
    let account = AccountRepo::create(
        pool,
        &CreateAccount {
            name: "Doe Family".to_string(),
            notes: None,
        },
    )
    .await
    .unwrap();
    let entity = ClientEntityRepo::create(
        pool,
        account.id,
        &CreateClientEntity {
            name: "Doe Household".to_string(),
            entity_type: "household".to_string(),
            tax_id_last4: None,
        },
    )
    .await
    .unwrap();
    let year = TaxYearRepo::create(
        pool,
        entity.id,
        &CreateTaxYear {
            tax_year: 2025,
            assigned_staff_id: None,
        },
    )
    .await
    .unwrap();
    (account.id, year)
}

fn new_invite(account_id: i64, token_hash: &str) -> CreateInvite {
    CreateInvite {
        account_id,
        email: "invitee@example.com".to_string(),
        first_name: None,
        last_name: None,
        permissions: vec!["view".to_string()],
        token_hash: token_hash.to_string(),
        invited_by: None,
        expires_at: Utc::now() + Duration::days(14),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_signers_and_signatures(pool: PgPool) {
    let (_, year) = create_tax_year(&pool).await;
    let a = create_user(&pool, "a@example.com", 3).await;
    let b = create_user(&pool, "b@example.com", 3).await;

    let mut tx = pool.begin().await.unwrap();
    EngagementRepo::replace_signers_in_tx(&mut tx, year.id, &[a, b, a]).await.unwrap();
    EngagementRepo::create_signature_in_tx(
        &mut tx,
        &CreateSignature {
            entity_tax_year_id: year.id,
            user_id: a,
            signature_name: "Pat Doe".to_string(),
            ip_address: None,
            user_agent: None,
        },
    )
    .await
    .unwrap();

    let mut required = EngagementRepo::required_signer_ids_in_tx(&mut tx, year.id).await.unwrap();
    required.sort_unstable();
    assert_eq!(required, vec![a, b]);
    assert_eq!(
        EngagementRepo::signed_user_ids_in_tx(&mut tx, year.id).await.unwrap(),
        vec![a]
    );
    tx.commit().await.unwrap();

    assert_eq!(EngagementRepo::list_signers(&pool, year.id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reopen_clears_later_milestones(pool: PgPool) {
    let (_, year) = create_tax_year(&pool).await;
    let signer = create_user(&pool, "signer@example.com", 3).await;

    let mut tx = pool.begin().await.unwrap();
    EngagementRepo::replace_signers_in_tx(&mut tx, year.id, &[signer]).await.unwrap();
    EngagementRepo::create_signature_in_tx(
        &mut tx,
        &CreateSignature {
            entity_tax_year_id: year.id,
            user_id: signer,
            signature_name: "Pat Doe".to_string(),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: None,
        },
    )
    .await
    .unwrap();
    TaxYearRepo::set_engagement_status(&mut tx, year.id, EngagementStatus::FullySigned)
        .await
        .unwrap();
    TaxYearRepo::mark_documents_confirmed(&mut tx, year.id).await.unwrap();
    TaxYearRepo::authorize_efile(&mut tx, year.id, signer, "Pat Doe").await.unwrap();
    TaxYearRepo::mark_filed(&mut tx, year.id).await.unwrap();
    tx.commit().await.unwrap();

    let filed = TaxYearRepo::find_by_id(&pool, year.id).await.unwrap().unwrap();
    assert_eq!(filed.status().unwrap(), InternalStatus::Filed);
    assert!(filed.filed_at.is_some());

    // Back to review: e-file and filing cleared, confirmation kept.
    let mut tx = pool.begin().await.unwrap();
    let locked = TaxYearRepo::lock_in_tx(&mut tx, year.id).await.unwrap().unwrap();
    assert_eq!(locked.id, year.id);
    TaxYearRepo::reset_for_reopen(&mut tx, year.id, InternalStatus::InReview).await.unwrap();
    TaxYearRepo::set_status(&mut tx, year.id, InternalStatus::InReview).await.unwrap();
    tx.commit().await.unwrap();

    let reviewed = TaxYearRepo::find_by_id(&pool, year.id).await.unwrap().unwrap();
    assert_eq!(reviewed.status().unwrap(), InternalStatus::InReview);
    assert!(reviewed.filed_at.is_none());
    assert!(reviewed.efile_authorized_at.is_none());
    assert!(reviewed.efile_signature_name.is_none());
    assert!(reviewed.documents_confirmed_at.is_some());
    assert_eq!(reviewed.engagement_status().unwrap(), EngagementStatus::FullySigned);

    // Back to the start: signatures dropped and engagement reset.
    let mut tx = pool.begin().await.unwrap();
    TaxYearRepo::reset_for_reopen(&mut tx, year.id, InternalStatus::SignEngagement)
        .await
        .unwrap();
    TaxYearRepo::set_status(&mut tx, year.id, InternalStatus::SignEngagement).await.unwrap();
    tx.commit().await.unwrap();

    let restarted = TaxYearRepo::find_by_id(&pool, year.id).await.unwrap().unwrap();
    assert_eq!(restarted.engagement_status().unwrap(), EngagementStatus::NotStarted);
    assert!(restarted.documents_confirmed_at.is_none());
    assert!(EngagementRepo::list_signatures(&pool, year.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invite_delivery_lifecycle(pool: PgPool) {
    let (account_id, _) = create_tax_year(&pool).await;
    let invite = InviteRepo::create(&pool, &new_invite(account_id, "hash-1")).await.unwrap();
    assert_eq!(invite.status, INVITE_QUEUED);

    let due = InviteRepo::list_due_for_delivery(&pool, 5, 10).await.unwrap();
    assert_eq!(due.len(), 1);

    InviteRepo::record_failure(&pool, invite.id, "connection refused").await.unwrap();
    let failed = InviteRepo::find_by_id(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(failed.attempts, 1);
    assert_eq!(failed.last_error.as_deref(), Some("connection refused"));

    // Out of attempts: skipped by the dispatcher.
    assert!(InviteRepo::list_due_for_delivery(&pool, 1, 10).await.unwrap().is_empty());

    assert!(InviteRepo::mark_sent(&pool, invite.id, "hash-sent").await.unwrap());
    assert!(!InviteRepo::mark_sent(&pool, invite.id, "hash-again").await.unwrap());
    let sent = InviteRepo::find_by_id(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(sent.status, INVITE_SENT);
    assert!(sent.last_error.is_none());
    assert_eq!(sent.token_hash, "hash-sent");

    let requeued = InviteRepo::requeue(&pool, invite.id, "hash-2", Utc::now() + Duration::days(14))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requeued.status, INVITE_QUEUED);
    assert_eq!(requeued.attempts, 0);

    let revoked = InviteRepo::revoke(&pool, invite.id).await.unwrap().unwrap();
    assert_eq!(revoked.status, INVITE_REVOKED);
    assert!(InviteRepo::revoke(&pool, invite.id).await.unwrap().is_none());
    assert!(InviteRepo::list_pending(&pool, 50, 0).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expired_invites_not_delivered(pool: PgPool) {
    let (account_id, _) = create_tax_year(&pool).await;
    let mut input = new_invite(account_id, "expired");
    input.expires_at = Utc::now() - Duration::minutes(1);
    InviteRepo::create(&pool, &input).await.unwrap();

    assert!(InviteRepo::list_due_for_delivery(&pool, 5, 10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_message_polling_after_id(pool: PgPool) {
    let (_, year) = create_tax_year(&pool).await;
    let client = create_user(&pool, "client@example.com", 3).await;
    let staff = create_user(&pool, "staff@example.com", 2).await;

    let thread = MessageRepo::get_or_create_thread(&pool, year.id).await.unwrap();
    let again = MessageRepo::get_or_create_thread(&pool, year.id).await.unwrap();
    assert_eq!(thread.id, again.id);

    let first = MessageRepo::create(&pool, thread.id, client, "Uploaded my W-2").await.unwrap();
    assert_eq!(first.sender_role, "client");
    assert_eq!(first.sender_name, "Pat Doe");
    let second = MessageRepo::create(&pool, thread.id, staff, "Thanks!").await.unwrap();

    let all = MessageRepo::list_after(&pool, thread.id, 0, 50).await.unwrap();
    assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![first.id, second.id]);

    let newer = MessageRepo::list_after(&pool, thread.id, first.id, 50).await.unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].sender_role, "staff");
}
