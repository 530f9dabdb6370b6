//! Handlers for client documents.
//!
//! Uploads are one file per request (`multipart/form-data`). The file goes
//! to the [`DocumentStore`](crate::storage::DocumentStore) first and the row
//! is written afterwards; if the row cannot be written the file is
//! discarded again.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use taxdesk_core::documents::{content_type_for, sanitize_filename, validate_upload};
use taxdesk_core::error::CoreError;
use taxdesk_core::hashing::sha256_hex;
use taxdesk_core::permissions::{PERM_UPLOAD, PERM_VIEW};
use taxdesk_core::types::DbId;
use taxdesk_core::workflow::InternalStatus;
use taxdesk_db::models::document::{CreateDocument, Document};
use taxdesk_db::repositories::{ChecklistRepo, DocumentRepo};
use taxdesk_events::bus::{EVENT_DOCUMENT_DELETED, EVENT_DOCUMENT_UPLOADED};
use taxdesk_events::DomainEvent;

use crate::access::authorize_tax_year;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::progress;
use crate::response::DataResponse;
use crate::state::AppState;

/// The parts of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    entity_tax_year_id: Option<DbId>,
    checklist_item_id: Option<DbId>,
    file: Option<(String, Vec<u8>)>,
}

/// POST /api/v1/documents/upload
///
/// Fields: `entity_tax_year_id`, optional `checklist_item_id`, `file`.
/// Clients need `upload` and may upload until the return is filed.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let form = read_form(multipart).await?;
    let tax_year_id = form
        .entity_tax_year_id
        .ok_or_else(|| AppError::BadRequest("Missing 'entity_tax_year_id' field".into()))?;
    let (filename, data) = form
        .file
        .ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;

    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_UPLOAD).await?;

    let ext = validate_upload(&filename, data.len(), state.config.max_upload_bytes)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let content_type = content_type_for(&ext).unwrap_or("application/octet-stream");

    if let Some(item_id) = form.checklist_item_id {
        let item = ChecklistRepo::find_by_id(&state.pool, item_id)
            .await?
            .ok_or(AppError::not_found("ChecklistItem", item_id))?;
        if item.entity_tax_year_id != tax_year_id {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Checklist item {item_id} does not belong to tax year {tax_year_id}"
            ))));
        }
    }

    let stored_path = state
        .documents
        .save(tax_year_id, &ext, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store document: {e}")))?;

    let input = CreateDocument {
        entity_tax_year_id: tax_year_id,
        checklist_item_id: form.checklist_item_id,
        uploaded_by: user.user_id,
        original_filename: sanitize_filename(&filename),
        stored_path: stored_path.clone(),
        content_type: content_type.to_string(),
        size_bytes: data.len() as i64,
        sha256: sha256_hex(&data),
    };

    let (document, moves) = match record_upload(&state, &user, &input).await {
        Ok(recorded) => recorded,
        Err(err) => {
            if let Err(e) = state.documents.discard(&stored_path).await {
                tracing::warn!(stored_path = %stored_path, error = %e, "Failed to discard orphaned upload");
            }
            return Err(err);
        }
    };

    tracing::info!(
        document_id = document.id,
        tax_year_id,
        checklist_item_id = ?document.checklist_item_id,
        size_bytes = document.size_bytes,
        user_id = user.user_id,
        "Document uploaded"
    );
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_DOCUMENT_UPLOADED, tax_year_id)
            .with_actor(user.user_id)
            .with_payload(json!({
                "document_id": document.id,
                "checklist_item_id": document.checklist_item_id,
                "filename": document.original_filename,
            })),
    );
    progress::publish_moves(&state.event_bus, tax_year_id, user.user_id, &moves);

    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// GET /api/v1/tax-years/{id}/documents
pub async fn list_by_tax_year(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tax_year_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Document>>>> {
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_VIEW).await?;
    let documents = DocumentRepo::list_by_tax_year(&state.pool, tax_year_id).await?;
    Ok(Json(DataResponse { data: documents }))
}

/// GET /api/v1/documents/{id}/download
pub async fn download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = find_document(&state, id).await?;
    authorize_tax_year(&state.pool, &user, document.entity_tax_year_id, PERM_VIEW)
        .await
        .map_err(|err| hide_tax_year(err, id))?;

    let data = state.documents.read(&document.stored_path).await.map_err(|e| {
        AppError::InternalError(format!(
            "Failed to read document {id} at '{}': {e}",
            document.stored_path
        ))
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&document.original_filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

/// DELETE /api/v1/documents/{id}
///
/// Soft delete; the file stays on disk. Clients need `upload` and may only
/// remove documents before they are confirmed.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let document = find_document(&state, id).await?;
    let tax_year_id = document.entity_tax_year_id;
    authorize_tax_year(&state.pool, &user, tax_year_id, PERM_UPLOAD)
        .await
        .map_err(|err| hide_tax_year(err, id))?;

    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, tax_year_id).await?;
    if !user.is_firm() && year.status()? > InternalStatus::ConfirmDocuments {
        return Err(AppError::Core(CoreError::Conflict(
            "Documents cannot be removed once they have been confirmed".into(),
        )));
    }
    if !DocumentRepo::soft_delete_in_tx(&mut tx, id).await? {
        return Err(AppError::not_found("Document", id));
    }
    let facts = progress::load_facts(&mut tx, &year).await?;
    let moves = progress::sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;

    tracing::info!(document_id = id, tax_year_id, user_id = user.user_id, "Document deleted");
    state.event_bus.publish(
        DomainEvent::for_tax_year(EVENT_DOCUMENT_DELETED, tax_year_id)
            .with_actor(user.user_id)
            .with_payload(json!({ "document_id": id })),
    );
    progress::publish_moves(&state.event_bus, tax_year_id, user.user_id, &moves);

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert the row and re-sync the stage in one transaction.
async fn record_upload(
    state: &AppState,
    user: &AuthUser,
    input: &CreateDocument,
) -> AppResult<(Document, Vec<progress::StatusMove>)> {
    let mut tx = state.pool.begin().await?;
    let year = progress::lock(&mut tx, input.entity_tax_year_id).await?;
    if !user.is_firm() && year.status()?.is_terminal() {
        return Err(AppError::Core(CoreError::Conflict(
            "The return has been filed; contact the firm to add documents".into(),
        )));
    }

    let document = DocumentRepo::create_in_tx(&mut tx, input).await?;
    let facts = progress::load_facts(&mut tx, &year).await?;
    let moves = progress::sync_in_tx(&mut tx, &year, &facts).await?;
    tx.commit().await?;
    Ok((document, moves))
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("entity_tax_year_id") => {
                let text = field.text().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.entity_tax_year_id = Some(parse_id("entity_tax_year_id", &text)?);
            }
            Some("checklist_item_id") => {
                let text = field.text().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.trim().is_empty() {
                    form.checklist_item_id = Some(parse_id("checklist_item_id", &text)?);
                }
            }
            Some("file") => {
                if form.file.is_some() {
                    return Err(AppError::BadRequest("Only one file per upload".into()));
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }
    Ok(form)
}

fn parse_id(field: &str, text: &str) -> AppResult<DbId> {
    text.trim()
        .parse::<DbId>()
        .map_err(|_| AppError::BadRequest(format!("'{field}' must be an integer id")))
}

async fn find_document(state: &AppState, id: DbId) -> AppResult<Document> {
    DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Document", id))
}

/// Report a hidden tax year as a missing document.
fn hide_tax_year(err: AppError, document_id: DbId) -> AppError {
    match err {
        AppError::Core(CoreError::NotFound { .. }) => AppError::not_found("Document", document_id),
        other => other,
    }
}
