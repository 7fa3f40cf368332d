use crate::adapters::chat::ChatClient;
use crate::domain::delivery::{SendError, SendReceipt, SessionStatus};
use crate::domain::payload::Payload;
use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat client backed by an HTTP bridge process that owns the authenticated chat session.
#[derive(Clone, Debug)]
pub struct BridgeChatClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutboundMessage<'a> {
    Text { body: &'a str },
    Media { filename: &'a str, mimetype: &'a str, data: String },
}

impl<'a> From<&'a Payload> for OutboundMessage<'a> {
    fn from(payload: &'a Payload) -> Self {
        match payload {
            Payload::Text(body) => Self::Text { body },
            Payload::File(file) => Self::Media {
                filename: &file.filename,
                mimetype: &file.mime_type,
                data: STANDARD.encode(&file.data),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionState {
    state: SessionStatus,
}

impl BridgeChatClient {
    /// Builds a client for the bridge at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, token: Option<String>, send_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(send_timeout).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), token })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn serialize(message: &OutboundMessage<'_>) -> Result<Bytes, SendError> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| SendError::Transport(format!("Failed to encode bridge request: {e}")))
}

/// Serializes the request body. File bodies are encoded once and shared by every send of the blob.
fn request_body(payload: &Payload) -> Result<Bytes, SendError> {
    match payload {
        Payload::Text(_) => serialize(&OutboundMessage::from(payload)),
        Payload::File(file) => {
            let body = file.encoded_with(|_| serialize(&OutboundMessage::from(payload)).unwrap_or_default());
            if body.is_empty() {
                return Err(SendError::Transport("Failed to encode bridge request".to_string()));
            }
            Ok(body)
        }
    }
}

fn classify_transport_error(err: &reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else if err.is_connect() {
        SendError::Unavailable
    } else {
        SendError::Transport(err.to_string())
    }
}

#[async_trait]
impl ChatClient for BridgeChatClient {
    #[tracing::instrument(level = "debug", skip(self, payload), fields(kind = payload.kind()))]
    async fn send(&self, destination: &str, payload: &Payload) -> Result<SendReceipt, SendError> {
        let response = self
            .request(Method::POST, &format!("/chats/{destination}/messages"))
            .header(CONTENT_TYPE, "application/json")
            .body(request_body(payload)?)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<SendReceipt>()
                .await
                .map_err(|e| SendError::Transport(format!("Malformed bridge receipt: {e}")));
        }

        match status {
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::CONFLICT => Err(SendError::Unavailable),
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => Err(SendError::Timeout),
            s if s.is_client_error() => {
                let reason = response.text().await.unwrap_or_default();
                let reason = if reason.is_empty() { s.to_string() } else { reason };
                Err(SendError::Rejected(reason))
            }
            s => Err(SendError::Transport(format!("Bridge responded with {s}"))),
        }
    }

    async fn session_status(&self) -> SessionStatus {
        let response = match self.request(Method::GET, "/session").send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = %r.status(), "Bridge session probe failed");
                return SessionStatus::Disconnected;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bridge session probe failed");
                return SessionStatus::Disconnected;
            }
        };

        match response.json::<SessionState>().await {
            Ok(body) => body.state,
            Err(e) => {
                tracing::warn!(error = %e, "Bridge returned a malformed session state");
                SessionStatus::Disconnected
            }
        }
    }
}
