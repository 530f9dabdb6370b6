//! Route definitions for `/questionnaire`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::questionnaire;
use crate::state::AppState;

/// Routes mounted at `/questionnaire`.
///
/// ```text
/// GET    /questions                -> list_questions (staff)
/// POST   /questions                -> create_question (admin)
/// PUT    /questions/{id}           -> update_question (admin)
/// DELETE /questions/{id}           -> deactivate_question (admin)
/// GET    /{tax_year_id}            -> get_questionnaire (view)
/// POST   /{tax_year_id}/answer     -> answer (questionnaire)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/questions",
            get(questionnaire::list_questions).post(questionnaire::create_question),
        )
        .route(
            "/questions/{id}",
            put(questionnaire::update_question).delete(questionnaire::deactivate_question),
        )
        .route("/{tax_year_id}", get(questionnaire::get_questionnaire))
        .route("/{tax_year_id}/answer", post(questionnaire::answer))
}
