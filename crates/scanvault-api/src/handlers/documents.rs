use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::{Bytes, BytesMut};
use scanvault_core::{AppError, DocumentResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentFound {
    pub message: String,
    pub document: DocumentResponse,
}

/// The parts of an upload form the orchestrator needs.
#[derive(Debug)]
pub(crate) struct UploadForm {
    pub data: Bytes,
    pub tag: String,
}

/// Read the `file` and `tag` fields, rejecting files over `max_size` as soon
/// as they cross it. An empty tag falls back to the file name.
pub(crate) async fn read_upload_form(
    multipart: &mut Multipart,
    max_size: u64,
) -> Result<UploadForm, HttpAppError> {
    let mut data: Option<Bytes> = None;
    let mut filename: Option<String> = None;
    let mut tag = String::new();

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                if data.is_some() {
                    return Err(AppError::ValidationFailed(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                filename = field.file_name().map(str::to_string);

                let mut buffer = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    if (buffer.len() + chunk.len()) as u64 > max_size {
                        return Err(AppError::PayloadTooLarge(format!(
                            "Uploaded data exceeds the maximum allowed size of {} bytes",
                            max_size
                        ))
                        .into());
                    }
                    buffer.extend_from_slice(&chunk);
                }
                data = Some(buffer.freeze());
            }
            "tag" => tag = field.text().await?,
            _ => {}
        }
    }

    let data =
        data.ok_or_else(|| AppError::ValidationFailed("No file provided".to_string()))?;
    if tag.is_empty() {
        tag = filename.unwrap_or_default();
    }

    Ok(UploadForm { data, tag })
}

#[utoipa::path(
    post,
    path = "/documents",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded, analysis scheduled", body = UploadResponse),
        (status = 200, description = "Identical content already registered", body = UploadResponse),
        (status = 400, description = "Empty file or invalid tag", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 504, description = "Upload deadline exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let limits = state.limits;

    let upload = async {
        let form = read_upload_form(&mut multipart, limits.max_upload_size).await?;
        let size = form.data.len() as u64;
        let mut reader = Cursor::new(form.data);
        state
            .service
            .upload(&mut reader, size, &form.tag)
            .await
            .map_err(HttpAppError::from)
    };

    let result = tokio::time::timeout(limits.upload_timeout, upload)
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "upload not completed within {}s",
                limits.upload_timeout.as_secs()
            ))
        })?;

    match result {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "document uploaded successfully.".to_string(),
                id,
            }),
        )
            .into_response()),
        Err(HttpAppError(AppError::AlreadyExists { id })) => Ok((
            StatusCode::OK,
            Json(UploadResponse {
                message: "document already exists.".to_string(),
                id,
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = String, Path, description = "Document identifier")
    ),
    responses(
        (status = 200, description = "Document found", body = DocumentFound),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = state.service.get_document(&id).await?;

    Ok(Json(DocumentFound {
        message: "document found".to_string(),
        document: DocumentResponse::from(document),
    }))
}
