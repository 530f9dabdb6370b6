//! Repository for questionnaire questions and answers.

use sqlx::PgPool;
use taxdesk_core::types::DbId;

use crate::models::questionnaire::{Answer, CreateQuestion, Question, UpdateQuestion};

const QUESTION_COLUMNS: &str = "id, section, prompt, answer_type, choices, is_required, \
                                 sort_order, is_active, created_at, updated_at";

const ANSWER_COLUMNS: &str =
    "id, entity_tax_year_id, question_id, value, answered_by, created_at, updated_at";

/// Provides operations for the firm questionnaire.
pub struct QuestionnaireRepo;

impl QuestionnaireRepo {
    pub async fn create_question(
        pool: &PgPool,
        input: &CreateQuestion,
    ) -> Result<Question, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaire_questions
                (section, prompt, answer_type, choices, is_required, sort_order)
             VALUES ($1, $2, $3, $4, COALESCE($5, false), COALESCE($6, 0))
             RETURNING {QUESTION_COLUMNS}"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(&input.section)
            .bind(&input.prompt)
            .bind(&input.answer_type)
            .bind(&input.choices)
            .bind(input.is_required)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    pub async fn find_question(pool: &PgPool, id: DbId) -> Result<Option<Question>, sqlx::Error> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questionnaire_questions WHERE id = $1");
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List questions in display order. Inactive questions only when asked.
    pub async fn list_questions(
        pool: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<Question>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM questionnaire_questions
             WHERE ($1 OR is_active = true)
             ORDER BY section, sort_order, id"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    pub async fn update_question(
        pool: &PgPool,
        id: DbId,
        input: &UpdateQuestion,
    ) -> Result<Option<Question>, sqlx::Error> {
        let query = format!(
            "UPDATE questionnaire_questions SET
                section = COALESCE($2, section),
                prompt = COALESCE($3, prompt),
                answer_type = COALESCE($4, answer_type),
                choices = COALESCE($5, choices),
                is_required = COALESCE($6, is_required),
                sort_order = COALESCE($7, sort_order),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {QUESTION_COLUMNS}"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .bind(&input.section)
            .bind(&input.prompt)
            .bind(&input.answer_type)
            .bind(&input.choices)
            .bind(input.is_required)
            .bind(input.sort_order)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Hide a question from clients without losing its answers.
    pub async fn deactivate_question(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questionnaire_questions SET is_active = false WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Answers ---------------------------------------------------------

    pub async fn list_answers(
        pool: &PgPool,
        entity_tax_year_id: DbId,
    ) -> Result<Vec<Answer>, sqlx::Error> {
        let query = format!(
            "SELECT {ANSWER_COLUMNS} FROM questionnaire_answers
             WHERE entity_tax_year_id = $1
             ORDER BY question_id"
        );
        sqlx::query_as::<_, Answer>(&query)
            .bind(entity_tax_year_id)
            .fetch_all(pool)
            .await
    }

    /// Insert or replace the answer to one question.
    pub async fn upsert_answer(
        pool: &PgPool,
        entity_tax_year_id: DbId,
        question_id: DbId,
        value: &str,
        answered_by: DbId,
    ) -> Result<Answer, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaire_answers (entity_tax_year_id, question_id, value, answered_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (entity_tax_year_id, question_id)
             DO UPDATE SET value = EXCLUDED.value, answered_by = EXCLUDED.answered_by
             RETURNING {ANSWER_COLUMNS}"
        );
        sqlx::query_as::<_, Answer>(&query)
            .bind(entity_tax_year_id)
            .bind(question_id)
            .bind(value)
            .bind(answered_by)
            .fetch_one(pool)
            .await
    }
}
