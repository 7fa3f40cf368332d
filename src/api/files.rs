use crate::adapters::storage::StoredUpload;
use crate::api::AppState;
use crate::api::messages::single_delivery_response;
use crate::api::schemas::messaging::BatchResponse;
use crate::domain::recipient::RecipientId;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::StreamExt;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Default)]
struct FileForm {
    numbers: Option<String>,
    upload: Option<StoredUpload>,
}

/// Reads a multipart form holding a `file` part and a text part named `numbers_field`.
///
/// The file is streamed straight into upload storage. If reading the form fails
/// after the file was staged, the staged file is deleted before returning.
async fn read_file_form(state: &AppState, mut multipart: Multipart, numbers_field: &str) -> Result<FileForm> {
    let mut form = FileForm::default();

    let result = async {
        while let Some(field) =
            multipart.next_field().await.map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("file") if form.upload.is_none() => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
                    let stream = field.map(|chunk| chunk.map_err(std::io::Error::other)).boxed();
                    form.upload = Some(state.messaging_service.stage_upload(&filename, &mime_type, stream).await?);
                }
                Some(n) if n == numbers_field => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Malformed multipart field: {e}")))?;
                    form.numbers = Some(text);
                }
                other => tracing::debug!(field = ?other, "Ignoring multipart field"),
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    if let Err(e) = result {
        if let Some(upload) = form.upload.take() {
            state.messaging_service.discard(&upload).await;
        }
        return Err(e);
    }

    Ok(form)
}

/// Rejects the form, deleting any file that was already staged.
async fn reject(state: &AppState, upload: Option<StoredUpload>, message: &str) -> AppError {
    if let Some(upload) = upload {
        state.messaging_service.discard(&upload).await;
    }
    AppError::BadRequest(message.to_string())
}

/// Sends an uploaded file to a single number.
///
/// # Errors
/// Returns `AppError::BadRequest` if the number or file is missing, or the number has no digits.
/// Returns `AppError::PayloadTooLarge` if the file exceeds the upload limit.
pub async fn send_file(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = read_file_form(&state, multipart, "number").await?;

    let (Some(number), Some(upload)) = (form.numbers.filter(|n| !n.is_empty()), form.upload.clone()) else {
        return Err(reject(&state, form.upload, "Missing number or file").await);
    };

    if RecipientId::parse(&number).is_none() {
        return Err(reject(&state, Some(upload), "Invalid number").await);
    }

    let report = state.messaging_service.send_file(&[number], upload).await?;
    single_delivery_response(report, "File sent successfully!", "Failed to send file")
}

/// Sends an uploaded file to a comma-separated list of numbers and reports each outcome.
///
/// # Errors
/// Returns `AppError::BadRequest` if the numbers or file are missing.
/// Returns `AppError::PayloadTooLarge` if the file exceeds the upload limit.
pub async fn send_file_multiple(State(state): State<AppState>, multipart: Multipart) -> Result<impl IntoResponse> {
    let form = read_file_form(&state, multipart, "numbers").await?;

    let (Some(numbers), Some(upload)) = (form.numbers.filter(|n| !n.is_empty()), form.upload.clone()) else {
        return Err(reject(&state, form.upload, "Missing numbers or file").await);
    };

    let numbers: Vec<&str> = numbers.split(',').collect();
    let report = state.messaging_service.send_file(&numbers, upload).await?;

    Ok((StatusCode::OK, Json(BatchResponse::processed("File processed for all numbers", report))))
}
