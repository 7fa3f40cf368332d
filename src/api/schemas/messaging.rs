use crate::domain::delivery::{ErrorInfo, SendReceipt};
use crate::domain::dispatch::BatchReport;
use serde::{Deserialize, Serialize};

/// A phone number as sent by clients, either a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipientInput {
    Text(String),
    Number(serde_json::Number),
}

impl RecipientInput {
    /// The number as text, with JSON numbers written the way a client would type them.
    ///
    /// Integral floats such as `15551234567.0` lose the trailing `.0`. Returns `None`
    /// for a number with a fractional part, which cannot be a phone number.
    #[must_use]
    pub fn into_raw(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(u.to_string())
                } else if let Some(i) = n.as_i64() {
                    Some(i.to_string())
                } else {
                    n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| format!("{f:.0}"))
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub number: Option<RecipientInput>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageMultipleRequest {
    pub numbers: Option<Vec<RecipientInput>>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub response: SendReceipt,
}

impl DeliveryResponse {
    #[must_use]
    pub const fn success(message: &'static str, response: SendReceipt) -> Self {
        Self { status: "success", message, response }
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveryFailureResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub error: ErrorInfo,
}

impl DeliveryFailureResponse {
    #[must_use]
    pub const fn failure(message: &'static str, error: ErrorInfo) -> Self {
        Self { status: "error", message, error }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub results: BatchReport,
}

impl BatchResponse {
    #[must_use]
    pub const fn processed(message: &'static str, results: BatchReport) -> Self {
        Self { status: "success", message, results }
    }
}
