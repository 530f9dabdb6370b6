//! Handlers for the per-tax-year message thread (`/threads/{tax_year_id}`).
//!
//! The client app polls with `after_id` set to the last id it has seen, so
//! a poll that finds nothing new is a cheap empty list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use taxdesk_core::error::CoreError;
use taxdesk_core::permissions::PERM_MESSAGE;
use taxdesk_core::types::DbId;
use taxdesk_db::models::message::Message;
use taxdesk_db::repositories::{clamp_limit, MessageRepo};
use taxdesk_events::bus::EVENT_MESSAGE_POSTED;
use taxdesk_events::DomainEvent;

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::AfterIdParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest message body accepted.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Request body for `POST /threads/{tax_year_id}/messages`.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

/// GET /api/v1/threads/{tax_year_id}/messages?after_id=&limit=
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
    Query(params): Query<AfterIdParams>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_MESSAGE).await?;

    let thread = MessageRepo::get_or_create_thread(&state.pool, tax_year_id).await?;
    let messages = MessageRepo::list_after(
        &state.pool,
        thread.id,
        params.after_id.unwrap_or(0).max(0),
        clamp_limit(params.limit),
    )
    .await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/threads/{tax_year_id}/messages
pub async fn post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
    Json(input): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_MESSAGE).await?;
    let body = validate_body(&input.body)?;

    let thread = MessageRepo::get_or_create_thread(&state.pool, tax_year_id).await?;
    let message = MessageRepo::create(&state.pool, thread.id, user.user_id, body).await?;

    tracing::debug!(
        message_id = message.id,
        tax_year_id,
        sender_id = user.user_id,
        "Message posted"
    );
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_MESSAGE_POSTED, tax_year_id)
            .with_actor(user.user_id)
            .with_payload(json!({
                "message_id": message.id,
                "sender_role": message.sender_role,
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

fn validate_body(body: &str) -> AppResult<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Message must not be empty".into(),
        )));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_LENGTH} characters"
        ))));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn body_is_trimmed() {
        assert_eq!(validate_body("  Where is my 1099?  ").unwrap(), "Where is my 1099?");
    }

    #[test]
    fn blank_and_oversized_bodies_are_rejected() {
        assert_matches!(validate_body(" \n "), Err(AppError::Core(CoreError::Validation(_))));
        let long = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        assert_matches!(validate_body(&long), Err(AppError::Core(CoreError::Validation(_))));
    }
}
