//! Handlers for the tax-year questionnaire.
//!
//! Question definitions are firm-managed (`/questionnaire/questions`);
//! answers are per tax year (`/questionnaire/{tax_year_id}`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taxdesk_core::error::CoreError;
use taxdesk_core::permissions::{PERM_QUESTIONNAIRE, PERM_VIEW};
use taxdesk_core::questionnaire::{
    completion, validate_answer, validate_question, AnswerType, Completion,
};
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::InternalStatus;
use taxdesk_db::models::questionnaire::{Answer, CreateQuestion, Question, UpdateQuestion};
use taxdesk_db::repositories::QuestionnaireRepo;
use taxdesk_events::bus::EVENT_QUESTIONNAIRE_ANSWERED;
use taxdesk_events::DomainEvent;

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Questions with the tax year's answers and progress.
#[derive(Debug, Serialize)]
pub struct QuestionnaireView {
    pub entity_tax_year_id: DbId,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub completion: Completion,
}

/// Request body for `POST /questionnaire/{tax_year_id}/answer`.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: DbId,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Question definitions
// ---------------------------------------------------------------------------

/// GET /api/v1/questionnaire/questions
pub async fn list_questions(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Question>>>> {
    let questions = QuestionnaireRepo::list_questions(&state.pool, params.include_inactive).await?;
    Ok(Json(DataResponse { data: questions }))
}

/// POST /api/v1/questionnaire/questions
pub async fn create_question(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(mut input): Json<CreateQuestion>,
) -> AppResult<(StatusCode, Json<DataResponse<Question>>)> {
    let answer_type = parse_answer_type(&input.answer_type)?;
    input.choices = trim_all(input.choices);
    validate_section(&input.section)?;
    validate_question(&input.prompt, answer_type, &input.choices)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let question = QuestionnaireRepo::create_question(&state.pool, &input).await?;
    tracing::info!(question_id = question.id, admin_id = admin.user_id, "Question created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: question })))
}

/// PUT /api/v1/questionnaire/questions/{id}
///
/// The merged definition (existing values overlaid with the update) must
/// still be valid.
pub async fn update_question(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateQuestion>,
) -> AppResult<Json<DataResponse<Question>>> {
    let existing = QuestionnaireRepo::find_question(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Question", id))?;

    input.choices = input.choices.map(trim_all);
    let answer_type = parse_answer_type(input.answer_type.as_deref().unwrap_or(&existing.answer_type))?;
    let prompt = input.prompt.as_deref().unwrap_or(&existing.prompt);
    let choices = input.choices.as_ref().unwrap_or(&existing.choices);
    if let Some(ref section) = input.section {
        validate_section(section)?;
    }
    validate_question(prompt, answer_type, choices)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let question = QuestionnaireRepo::update_question(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Question", id))?;
    Ok(Json(DataResponse { data: question }))
}

/// DELETE /api/v1/questionnaire/questions/{id}
///
/// Deactivates the question; existing answers are kept.
pub async fn deactivate_question(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if QuestionnaireRepo::deactivate_question(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Question", id))
    }
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// GET /api/v1/questionnaire/{tax_year_id}
pub async fn get_questionnaire(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
) -> AppResult<Json<DataResponse<QuestionnaireView>>> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_VIEW).await?;
    let view = load_view(&state, tax_year_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/questionnaire/{tax_year_id}/answer
///
/// Insert or replace one answer. Closed once the return is filed.
pub async fn answer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
    Json(input): Json<AnswerRequest>,
) -> AppResult<Json<DataResponse<Answer>>> {
    let year = authorize_tax_year(&state.pool, &user, tax_year_id, PERM_QUESTIONNAIRE).await?;
    if year.internal_status_id == InternalStatus::Filed.id() {
        return Err(AppError::Core(CoreError::Conflict(
            "The questionnaire is closed once the return is filed".into(),
        )));
    }

    let question = QuestionnaireRepo::find_question(&state.pool, input.question_id)
        .await?
        .filter(|q| q.is_active)
        .ok_or(AppError::not_found("Question", input.question_id))?;

    let answer_type = parse_answer_type(&question.answer_type)?;
    let value = validate_answer(answer_type, &question.choices, &input.value)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let answer =
        QuestionnaireRepo::upsert_answer(&state.pool, tax_year_id, question.id, &value, user.user_id)
            .await?;

    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_QUESTIONNAIRE_ANSWERED, tax_year_id)
            .with_actor(user.user_id)
            .with_payload(json!({ "question_id": question.id })),
    );

    Ok(Json(DataResponse { data: answer }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Active questions, the tax year's answers and required-question progress.
pub(crate) async fn load_view(state: &AppState, tax_year_id: DbId) -> AppResult<QuestionnaireView> {
    let questions = QuestionnaireRepo::list_questions(&state.pool, false).await?;
    let answers = QuestionnaireRepo::list_answers(&state.pool, tax_year_id).await?;

    let required: Vec<DbId> = questions
        .iter()
        .filter(|q| q.is_required)
        .map(|q| q.id)
        .collect();
    let answered: Vec<DbId> = answers.iter().map(|a| a.question_id).collect();

    Ok(QuestionnaireView {
        entity_tax_year_id: tax_year_id,
        completion: completion(&required, &answered),
        questions,
        answers,
    })
}

fn parse_answer_type(value: &str) -> AppResult<AnswerType> {
    AnswerType::from_str_value(value).map_err(|msg| AppError::Core(CoreError::Validation(msg)))
}

fn validate_section(section: &str) -> AppResult<()> {
    if section.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Question section must not be empty".into(),
        )));
    }
    Ok(())
}

fn trim_all(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.trim().to_string()).collect()
}
