//! Client-facing tax-year overview (`/client/tax-years`).
//!
//! Any authenticated user. Clients see the tax years their ACL rows reach;
//! firm users see every tax year, paged.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use taxdesk_core::engagement::EngagementStatus;
use taxdesk_core::permissions::PERM_VIEW;
use taxdesk_core::questionnaire::Completion;
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::{stage_view, InternalStatus, StageView, TaxYearFacts};
use taxdesk_db::models::checklist::ChecklistItemWithCount;
use taxdesk_db::models::tax_year::TaxYearWithEntity;
use taxdesk_db::repositories::{clamp_limit, clamp_offset, ChecklistRepo, TaxYearRepo};

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::handlers::questionnaire;
use crate::middleware::auth::AuthUser;
use crate::progress;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// One row of the client's tax-year list.
#[derive(Debug, Serialize)]
pub struct ClientTaxYear {
    #[serde(flatten)]
    pub tax_year: TaxYearWithEntity,
    pub engagement_status: EngagementStatus,
    pub stage: StageView,
}

/// Checklist counts for the status screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub total: usize,
    /// Required items that still apply.
    pub required: usize,
    /// Required items with at least one document.
    pub satisfied: usize,
    pub not_applicable: usize,
}

impl ChecklistProgress {
    pub fn from_items(items: &[ChecklistItemWithCount]) -> Self {
        let applicable_required = items
            .iter()
            .filter(|i| i.is_required && !i.is_not_applicable);
        Self {
            total: items.len(),
            required: applicable_required.clone().count(),
            satisfied: applicable_required.filter(|i| i.document_count > 0).count(),
            not_applicable: items.iter().filter(|i| i.is_not_applicable).count(),
        }
    }
}

/// Full status of one tax year as the client app renders it.
#[derive(Debug, Serialize)]
pub struct TaxYearStatus {
    pub entity_tax_year_id: DbId,
    pub entity_name: String,
    pub tax_year: i32,
    pub stage: StageView,
    pub engagement_status: EngagementStatus,
    pub checklist: ChecklistProgress,
    pub questionnaire: Completion,
    pub documents_confirmed: bool,
    pub efile_authorized: bool,
    pub extension_requested: bool,
}

/// GET /api/v1/client/tax-years
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ClientTaxYear>>>> {
    let years = if user.is_firm() {
        TaxYearRepo::list_all(
            &state.pool,
            clamp_limit(params.limit),
            clamp_offset(params.offset),
        )
        .await?
    } else {
        TaxYearRepo::list_visible_to_user(&state.pool, user.user_id).await?
    };

    let rows = years
        .into_iter()
        .map(|year| {
            let status = year.status()?;
            let facts = listed_facts(&year, status)?;
            Ok(ClientTaxYear {
                engagement_status: facts.engagement,
                stage: stage_view(status, &facts),
                tax_year: year,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/client/tax-years/{id}/status
pub async fn status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxYearStatus>>> {
    let with_entity = authorize_tax_year(&state.pool, &user, id, PERM_VIEW).await?;

    let year = TaxYearRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("TaxYear", id))?;
    let mut tx = state.pool.begin().await?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    tx.commit().await?;

    let items = ChecklistRepo::list_with_counts(&state.pool, id).await?;
    let questionnaire = questionnaire::load_view(&state, id).await?;

    Ok(Json(DataResponse {
        data: TaxYearStatus {
            entity_tax_year_id: id,
            entity_name: with_entity.entity_name,
            tax_year: year.tax_year,
            stage: stage_view(year.status()?, &facts),
            engagement_status: facts.engagement,
            checklist: ChecklistProgress::from_items(&items),
            questionnaire: questionnaire.completion,
            documents_confirmed: facts.documents_confirmed,
            efile_authorized: facts.efile_authorized,
            extension_requested: facts.extension_requested,
        },
    }))
}

/// Facts for a listed row. The persisted stage stands in for the checklist
/// fact, which the stage is kept in step with.
fn listed_facts(year: &TaxYearWithEntity, status: InternalStatus) -> AppResult<TaxYearFacts> {
    Ok(TaxYearFacts {
        current: status,
        engagement: year.engagement_status()?,
        required_items_satisfied: status >= InternalStatus::ConfirmDocuments,
        documents_confirmed: year.documents_confirmed_at.is_some(),
        efile_authorized: year.efile_authorized_at.is_some(),
        extension_requested: year.extension_requested_at.is_some(),
    })
}
