//! Keeps a tax year's persisted stage in step with its facts.
//!
//! Every handler that changes signers, signatures, checklist items or
//! documents locks the tax year row, makes its change, then calls
//! [`sync_in_tx`] before committing. The returned moves are published once
//! the transaction has committed.

use serde_json::json;
use taxdesk_core::documents::required_items_satisfied;
use taxdesk_core::engagement::derive_engagement_status;
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::{reconcile, InternalStatus, TaxYearFacts};
use taxdesk_db::models::tax_year::EntityTaxYear;
use taxdesk_db::repositories::{ChecklistRepo, DocumentRepo, EngagementRepo, TaxYearRepo};
use taxdesk_db::{DbPool, DbTx};
use taxdesk_events::bus::EVENT_STATUS_CHANGED;
use taxdesk_events::{DomainEvent, EventBus};

use crate::error::{AppError, AppResult};

/// One stage change applied to a tax year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMove {
    pub from: InternalStatus,
    pub to: InternalStatus,
}

/// Lock a tax year for a read-then-write workflow step.
pub async fn lock(tx: &mut DbTx<'_>, tax_year_id: DbId) -> AppResult<EntityTaxYear> {
    TaxYearRepo::lock_in_tx(tx, tax_year_id)
        .await?
        .ok_or(AppError::not_found("TaxYear", tax_year_id))
}

/// Gather the workflow facts for a locked tax year.
pub async fn load_facts(tx: &mut DbTx<'_>, year: &EntityTaxYear) -> AppResult<TaxYearFacts> {
    let required = EngagementRepo::required_signer_ids_in_tx(tx, year.id).await?;
    let signed = EngagementRepo::signed_user_ids_in_tx(tx, year.id).await?;
    let items = ChecklistRepo::list_requirements_in_tx(tx, year.id).await?;
    let documented = DocumentRepo::documented_item_ids_in_tx(tx, year.id).await?;

    Ok(TaxYearFacts {
        current: year.status()?,
        engagement: derive_engagement_status(&required, &signed),
        required_items_satisfied: required_items_satisfied(&items, &documented),
        documents_confirmed: year.documents_confirmed_at.is_some(),
        efile_authorized: year.efile_authorized_at.is_some(),
        extension_requested: year.extension_requested_at.is_some(),
    })
}

/// Persist the engagement status and any stage moves the facts imply.
///
/// `year` must have been locked in `tx`.
pub async fn sync_in_tx(
    tx: &mut DbTx<'_>,
    year: &EntityTaxYear,
    facts: &TaxYearFacts,
) -> AppResult<Vec<StatusMove>> {
    if year.engagement_status()? != facts.engagement {
        TaxYearRepo::set_engagement_status(tx, year.id, facts.engagement).await?;
    }

    let mut current = facts.current;
    let mut moves = Vec::new();
    for next in reconcile(facts) {
        TaxYearRepo::set_status(tx, year.id, next).await?;
        moves.push(StatusMove {
            from: current,
            to: next,
        });
        current = next;
    }
    Ok(moves)
}

/// Re-derive a tax year's stage after a change made outside a workflow
/// transaction (checklist edits by staff), then publish the moves.
pub async fn resync(
    pool: &DbPool,
    bus: &EventBus,
    tax_year_id: DbId,
    actor: DbId,
) -> AppResult<Vec<StatusMove>> {
    let mut tx = pool.begin().await?;
    let year = lock(&mut tx, tax_year_id).await?;
    let facts = load_facts(&mut tx, &year).await?;
    let moves = sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;

    publish_moves(bus, tax_year_id, actor, &moves);
    Ok(moves)
}

/// Publish a `tax_year.status_changed` event per move.
pub fn publish_moves(bus: &EventBus, tax_year_id: DbId, actor: DbId, moves: &[StatusMove]) {
    for m in moves {
        tracing::info!(
            tax_year_id,
            from = m.from.code(),
            to = m.to.code(),
            actor,
            "Tax year status changed"
        );
        bus.publish(
            DomainEvent::for_tax_year(EVENT_STATUS_CHANGED, tax_year_id)
                .with_actor(actor)
                .with_payload(json!({
                    "from": m.from.code(),
                    "to": m.to.code(),
                })),
        );
    }
}
