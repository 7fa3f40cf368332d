use crate::adapters::chat::ChatClient;
use crate::adapters::storage::UploadStore;
use crate::config::HealthConfig;
use crate::domain::delivery::SessionStatus;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("msg-gateway");
        Self {
            status: meter
                .i64_gauge("gateway_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    chat_client: Arc<dyn ChatClient>,
    uploads: Arc<dyn UploadStore>,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(chat_client: Arc<dyn ChatClient>, uploads: Arc<dyn UploadStore>, config: HealthConfig) -> Self {
        Self { chat_client, uploads, config, metrics: Metrics::new() }
    }

    /// Checks that the chat session is authenticated and able to send.
    ///
    /// # Errors
    /// Returns the observed status if the session is not ready or the probe timed out.
    pub async fn check_session(&self) -> Result<(), SessionStatus> {
        let session_timeout = Duration::from_millis(self.config.session_timeout_ms);

        let status = timeout(session_timeout, self.chat_client.session_status()).await.unwrap_or_else(|_| {
            tracing::debug!("Chat session probe timed out");
            SessionStatus::Disconnected
        });

        if status == SessionStatus::Ready {
            self.metrics.status.record(1, &[KeyValue::new("component", "session")]);
            Ok(())
        } else {
            self.metrics.status.record(0, &[KeyValue::new("component", "session")]);
            Err(status)
        }
    }

    /// Checks that the upload directory is writable.
    ///
    /// # Errors
    /// Returns a string describing the failure if the directory is unusable.
    pub async fn check_storage(&self) -> Result<(), String> {
        let storage_timeout = Duration::from_millis(self.config.storage_timeout_ms);

        match timeout(storage_timeout, self.uploads.check()).await {
            Ok(Ok(())) => {
                self.metrics.status.record(1, &[KeyValue::new("component", "storage")]);
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "storage")]);
                Err(format!("Upload storage check failed: {e}"))
            }
            Err(_) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "storage")]);
                Err("Upload storage check timed out".to_string())
            }
        }
    }
}
