use crate::api::AppState;
use crate::api::schemas::messaging::{
    BatchResponse, DeliveryFailureResponse, DeliveryResponse, RecipientInput, SendMessageMultipleRequest,
    SendMessageRequest,
};
use crate::domain::dispatch::{BatchReport, DispatchDetail};
use crate::domain::recipient::RecipientId;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Turns the report of a one-recipient dispatch into a 200 or 500 response.
pub(crate) fn single_delivery_response(
    report: BatchReport,
    success_message: &'static str,
    failure_message: &'static str,
) -> Result<Response> {
    let outcome = report.into_outcomes().into_iter().next().ok_or(AppError::Internal)?;

    Ok(match outcome.into_detail() {
        DispatchDetail::Delivered(receipt) => {
            (StatusCode::OK, Json(DeliveryResponse::success(success_message, receipt))).into_response()
        }
        DispatchDetail::Failed(error) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(DeliveryFailureResponse::failure(failure_message, error)))
                .into_response()
        }
    })
}

/// Sends a text message to a single number.
///
/// # Errors
/// Returns `AppError::BadRequest` if the body is malformed, the number or message is missing,
/// or the number has no digits.
pub async fn send_message(
    State(state): State<AppState>,
    req: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = req?;
    let (Some(number), Some(message)) = (req.number, req.message.filter(|m| !m.is_empty())) else {
        return Err(AppError::BadRequest("Missing number or message".into()));
    };

    let Some(number) = number.into_raw().filter(|n| RecipientId::parse(n).is_some()) else {
        return Err(AppError::BadRequest("Invalid number".into()));
    };

    let report = state.messaging_service.send_text(&[number], message).await?;
    single_delivery_response(report, "Message sent successfully!", "Failed to send message")
}

/// Sends the same text message to many numbers and reports each outcome.
///
/// # Errors
/// Returns `AppError::BadRequest` if the body is malformed, the numbers or message are missing,
/// or a number has a fractional part.
pub async fn send_message_multiple(
    State(state): State<AppState>,
    req: std::result::Result<Json<SendMessageMultipleRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = req?;
    let (Some(numbers), Some(message)) =
        (req.numbers.filter(|n| !n.is_empty()), req.message.filter(|m| !m.is_empty()))
    else {
        return Err(AppError::BadRequest("Missing number or message".into()));
    };

    let numbers = numbers
        .into_iter()
        .map(RecipientInput::into_raw)
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| AppError::BadRequest("Invalid number".into()))?;
    let report = state.messaging_service.send_text(&numbers, message).await?;

    Ok((StatusCode::OK, Json(BatchResponse::processed("Messages processed", report))))
}
