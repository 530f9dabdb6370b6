//! Questionnaire questions and per-tax-year answers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taxdesk_core::types::{DbId, Timestamp};

/// A row from `questionnaire_questions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: DbId,
    pub section: String,
    pub prompt: String,
    pub answer_type: String,
    pub choices: Vec<String>,
    pub is_required: bool,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestion {
    pub section: String,
    pub prompt: String,
    pub answer_type: String,
    #[serde(default)]
    pub choices: Vec<String>,
    pub is_required: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuestion {
    pub section: Option<String>,
    pub prompt: Option<String>,
    pub answer_type: Option<String>,
    pub choices: Option<Vec<String>>,
    pub is_required: Option<bool>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// A row from `questionnaire_answers`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Answer {
    pub id: DbId,
    pub entity_tax_year_id: DbId,
    pub question_id: DbId,
    pub value: String,
    pub answered_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
