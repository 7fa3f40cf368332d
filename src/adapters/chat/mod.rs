use crate::domain::delivery::{SendError, SendReceipt, SessionStatus};
use crate::domain::payload::Payload;
use async_trait::async_trait;

pub mod bridge;
pub mod log;

pub use bridge::BridgeChatClient;
pub use log::LogChatClient;

/// The external chat session that actually delivers messages.
#[async_trait]
pub trait ChatClient: Send + Sync + std::fmt::Debug {
    /// Delivers `payload` to a fully-qualified chat address such as `15551234567@c.us`.
    ///
    /// # Errors
    /// Returns `SendError::Unavailable` while the session is not authenticated.
    async fn send(&self, destination: &str, payload: &Payload) -> Result<SendReceipt, SendError>;

    async fn session_status(&self) -> SessionStatus;
}
