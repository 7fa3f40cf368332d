use crate::adapters::chat::ChatClient;
use crate::domain::delivery::{SendError, SendReceipt, SessionStatus};
use crate::domain::payload::Payload;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Chat client that only logs. Useful for local development without a chat session.
#[derive(Debug, Default)]
pub struct LogChatClient;

#[async_trait]
impl ChatClient for LogChatClient {
    async fn send(&self, destination: &str, payload: &Payload) -> Result<SendReceipt, SendError> {
        match payload {
            Payload::Text(text) => {
                tracing::info!(destination = %destination, length = text.len(), "STUB: Sending chat message");
            }
            Payload::File(file) => {
                tracing::info!(
                    destination = %destination,
                    filename = %file.filename,
                    size = file.data.len(),
                    "STUB: Sending chat file"
                );
            }
        }

        Ok(SendReceipt { id: Uuid::new_v4().to_string(), timestamp: OffsetDateTime::now_utc().unix_timestamp() })
    }

    async fn session_status(&self) -> SessionStatus {
        SessionStatus::Ready
    }
}
