use crate::api::MgmtState;
use crate::api::schemas::health::HealthResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: checks the chat session and the upload directory.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let (session_res, storage_res) =
        tokio::join!(state.health_service.check_session(), state.health_service.check_storage());

    let mut status_code = StatusCode::OK;
    let session_status = match session_res {
        Ok(()) => "ready".to_string(),
        Err(status) => {
            tracing::warn!(session = status.as_str(), component = "session", "Readiness probe failed");
            status_code = StatusCode::SERVICE_UNAVAILABLE;
            status.as_str().to_string()
        }
    };

    let storage_status = if let Err(e) = storage_res {
        tracing::warn!(error = %e, component = "storage", "Readiness probe failed");
        status_code = StatusCode::SERVICE_UNAVAILABLE;
        "error"
    } else {
        "ok"
    };

    let response = HealthResponse {
        status: if status_code == StatusCode::OK { "ok" } else { "error" }.to_string(),
        session: session_status,
        storage: storage_status.to_string(),
    };

    (status_code, Json(response))
}
