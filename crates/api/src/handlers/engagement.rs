//! Handlers for engagement letter signing (`/engagement/{tax_year_id}`).

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taxdesk_core::engagement::{check_can_sign, validate_signature_name, EngagementStatus};
use taxdesk_core::permissions::{PERM_SIGN, PERM_VIEW};
use taxdesk_core::types::DbId;
use taxdesk_db::models::engagement::{CreateSignature, EngagementSignature, EngagementSigner};
use taxdesk_db::repositories::{EngagementRepo, TaxYearRepo};
use taxdesk_events::bus::EVENT_ENGAGEMENT_SIGNED;
use taxdesk_events::DomainEvent;

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::progress;
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest user agent string kept on a signature record.
const MAX_USER_AGENT_LENGTH: usize = 512;

/// Signing state of one engagement letter.
#[derive(Debug, Serialize)]
pub struct EngagementView {
    pub entity_tax_year_id: DbId,
    pub status: EngagementStatus,
    pub signers: Vec<EngagementSigner>,
    pub signatures: Vec<EngagementSignature>,
    /// Whether the caller is a required signer who has not signed yet.
    pub awaiting_caller: bool,
}

/// Request body for `POST /engagement/{id}/sign`.
#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub signature_name: String,
}

/// GET /api/v1/engagement/{tax_year_id}
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
) -> AppResult<Json<DataResponse<EngagementView>>> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_VIEW).await?;
    let view = load_view(&state, tax_year_id, user.user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/engagement/{tax_year_id}/sign
///
/// Record the caller's signature. The last required signature moves the
/// tax year on to `UPLOAD_DOCUMENTS` (or further, if the checklist is
/// already satisfied).
pub async fn sign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
    headers: HeaderMap,
    Json(input): Json<SignRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EngagementView>>)> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_SIGN).await?;
    let signature_name = validate_signature_name(&input.signature_name)?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, tax_year_id).await?;
    let required = EngagementRepo::required_signer_ids_in_tx(&mut tx, tax_year_id).await?;
    let signed = EngagementRepo::signed_user_ids_in_tx(&mut tx, tax_year_id).await?;
    check_can_sign(year.status()?, user.user_id, &required, &signed)?;

    let signature = EngagementRepo::create_signature_in_tx(
        &mut tx,
        &CreateSignature {
            entity_tax_year_id: tax_year_id,
            user_id: user.user_id,
            signature_name,
            ip_address: client_ip(&headers),
            user_agent: user_agent(&headers),
        },
    )
    .await?;

    let facts = progress::load_facts(&mut tx, &year).await?;
    let moves = progress::sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;

    tracing::info!(
        tax_year_id,
        signature_id = signature.id,
        engagement = ?facts.engagement,
        user_id = user.user_id,
        "Engagement letter signed"
    );
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_ENGAGEMENT_SIGNED, tax_year_id)
            .with_actor(user.user_id)
            .with_payload(json!({
                "signature_id": signature.id,
                "engagement_status": facts.engagement,
            })),
    );
    progress::publish_moves(&state.event_bus, tax_year_id, user.user_id, &moves);

    let view = load_view(&state, tax_year_id, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

async fn load_view(state: &AppState, tax_year_id: DbId, caller: DbId) -> AppResult<EngagementView> {
    let year = TaxYearRepo::find_by_id(&state.pool, tax_year_id)
        .await?
        .ok_or(AppError::not_found("TaxYear", tax_year_id))?;
    let signers = EngagementRepo::list_signers(&state.pool, tax_year_id).await?;
    let signatures = EngagementRepo::list_signatures(&state.pool, tax_year_id).await?;

    let awaiting_caller = signers.iter().any(|s| s.user_id == caller)
        && !signatures.iter().any(|s| s.user_id == caller);

    Ok(EngagementView {
        entity_tax_year_id: tax_year_id,
        status: year.engagement_status()?,
        signers,
        signatures,
        awaiting_caller,
    })
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_LENGTH).collect())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn user_agent_is_truncated() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(MAX_USER_AGENT_LENGTH + 50);
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&long).unwrap());
        assert_eq!(user_agent(&headers).map(|ua| ua.len()), Some(MAX_USER_AGENT_LENGTH));
    }
}
