use crate::domain::delivery::{ErrorInfo, SendError, SendReceipt};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "error")]
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DispatchDetail {
    #[serde(rename = "response")]
    Delivered(SendReceipt),
    #[serde(rename = "error")]
    Failed(ErrorInfo),
}

/// Result of sending the batch payload to one recipient.
///
/// Serializes as `{"input", "number", "status", "response"|"error"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    input: String,
    #[serde(rename = "number")]
    recipient: String,
    status: DispatchStatus,
    #[serde(flatten)]
    detail: DispatchDetail,
}

impl DispatchOutcome {
    #[must_use]
    pub fn delivered(input: String, recipient: String, receipt: SendReceipt) -> Self {
        Self { input, recipient, status: DispatchStatus::Success, detail: DispatchDetail::Delivered(receipt) }
    }

    #[must_use]
    pub fn failed(input: String, recipient: String, error: &SendError) -> Self {
        Self { input, recipient, status: DispatchStatus::Failure, detail: DispatchDetail::Failed(error.into()) }
    }

    /// The identifier exactly as the caller submitted it.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The normalized, digit-only identifier.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    #[must_use]
    pub const fn status(&self) -> DispatchStatus {
        self.status
    }

    #[must_use]
    pub fn into_detail(self) -> DispatchDetail {
        self.detail
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, DispatchStatus::Success)
    }

    #[must_use]
    pub const fn receipt(&self) -> Option<&SendReceipt> {
        match &self.detail {
            DispatchDetail::Delivered(receipt) => Some(receipt),
            DispatchDetail::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ErrorInfo> {
        match &self.detail {
            DispatchDetail::Delivered(_) => None,
            DispatchDetail::Failed(info) => Some(info),
        }
    }
}

/// One outcome per submitted recipient, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchReport(Vec<DispatchOutcome>);

impl BatchReport {
    #[must_use]
    pub const fn new(outcomes: Vec<DispatchOutcome>) -> Self {
        Self(outcomes)
    }

    #[must_use]
    pub fn outcomes(&self) -> &[DispatchOutcome] {
        &self.0
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<DispatchOutcome> {
        self.0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.0.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serialization_shape() {
        let ok = DispatchOutcome::delivered(
            "+1 555".to_string(),
            "1555".to_string(),
            SendReceipt { id: "abc".to_string(), timestamp: 10 },
        );
        let err = DispatchOutcome::failed("222".to_string(), "222".to_string(), &SendError::Timeout);

        assert_eq!(
            serde_json::to_value(&ok).expect("serializable"),
            json!({"input": "+1 555", "number": "1555", "status": "success", "response": {"id": "abc", "timestamp": 10}})
        );
        assert_eq!(
            serde_json::to_value(&err).expect("serializable"),
            json!({
                "input": "222",
                "number": "222",
                "status": "error",
                "error": {"code": "network_timeout", "message": "Timed out waiting for the chat network"}
            })
        );
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport::new(vec![
            DispatchOutcome::failed("x".to_string(), String::new(), &SendError::InvalidRecipient),
            DispatchOutcome::delivered("1".to_string(), "1".to_string(), SendReceipt { id: "m".into(), timestamp: 0 }),
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(serde_json::to_value(&report).expect("serializable").is_array());
    }
}
