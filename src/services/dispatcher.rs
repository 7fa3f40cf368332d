use crate::adapters::chat::ChatClient;
use crate::config::MessagingConfig;
use crate::domain::delivery::SendError;
use crate::domain::dispatch::{BatchReport, DispatchOutcome};
use crate::domain::payload::Payload;
use crate::domain::recipient::RecipientId;
use crate::error::{AppError, Result};
use futures::future::join_all;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) outcomes_total: Counter<u64>,
    pub(crate) batch_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("msg-gateway");
        Self {
            outcomes_total: meter
                .u64_counter("gateway_dispatch_outcomes_total")
                .with_description("Per-recipient send outcomes")
                .build(),
            batch_size: meter
                .u64_histogram("gateway_dispatch_batch_size")
                .with_description("Number of recipients in a single dispatch")
                .build(),
        }
    }
}

/// Sends one payload to many recipients at once and reports every outcome.
///
/// All sends are started together and joined; nothing is throttled or retried.
/// A failed send only ever affects its own entry in the [`BatchReport`].
#[derive(Clone, Debug)]
pub struct FanOutDispatcher {
    client: Arc<dyn ChatClient>,
    destination_suffix: String,
    metrics: Metrics,
}

impl FanOutDispatcher {
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, config: &MessagingConfig) -> Self {
        Self { client, destination_suffix: config.destination_suffix.clone(), metrics: Metrics::new() }
    }

    /// Dispatches `payload` to every recipient and returns outcomes in input order.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if `recipients` is empty or the payload is empty.
    /// Individual send failures are reported inside the returned report, never as an error.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, recipients, payload),
        fields(recipients = recipients.len(), kind = payload.kind())
    )]
    pub async fn dispatch<S: AsRef<str>>(&self, recipients: &[S], payload: &Payload) -> Result<BatchReport> {
        if recipients.is_empty() {
            return Err(AppError::BadRequest("At least one recipient is required".into()));
        }
        if payload.is_empty() {
            return Err(AppError::BadRequest("Payload is missing".into()));
        }

        self.metrics.batch_size.record(recipients.len() as u64, &[KeyValue::new("kind", payload.kind())]);

        // join_all yields results in the order the futures were supplied.
        let outcomes = join_all(recipients.iter().map(|raw| self.send_one(raw.as_ref(), payload))).await;
        let report = BatchReport::new(outcomes);

        tracing::info!(succeeded = report.succeeded(), failed = report.failed(), "Dispatch settled");
        Ok(report)
    }

    async fn send_one(&self, raw: &str, payload: &Payload) -> DispatchOutcome {
        let Some(recipient) = RecipientId::parse(raw) else {
            tracing::warn!(input = %raw, "Recipient has no digits, skipping");
            self.metrics.outcomes_total.add(1, &[KeyValue::new("status", "invalid")]);
            return DispatchOutcome::failed(raw.to_string(), String::new(), &SendError::InvalidRecipient);
        };

        let destination = recipient.destination(&self.destination_suffix);

        match self.client.send(&destination, payload).await {
            Ok(receipt) => {
                tracing::info!(recipient = %recipient, "Sent successfully");
                self.metrics.outcomes_total.add(1, &[KeyValue::new("status", "success")]);
                DispatchOutcome::delivered(raw.to_string(), recipient.to_string(), receipt)
            }
            Err(e) => {
                tracing::warn!(recipient = %recipient, error = %e, code = e.code(), "Failed to send");
                self.metrics.outcomes_total.add(1, &[KeyValue::new("status", "failure")]);
                DispatchOutcome::failed(raw.to_string(), recipient.to_string(), &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::{SendReceipt, SessionStatus};
    use crate::domain::dispatch::DispatchStatus;
    use async_trait::async_trait;
    use rand::Rng;
    use rand::seq::SliceRandom;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct Script {
        delay: Duration,
        result: std::result::Result<(), SendError>,
    }

    /// Replies per destination according to a script; unknown destinations succeed instantly.
    #[derive(Debug, Default)]
    struct ScriptedClient {
        scripts: HashMap<String, Script>,
        calls: AtomicUsize,
        destinations: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn with(mut self, destination: &str, delay_ms: u64, result: std::result::Result<(), SendError>) -> Self {
            self.scripts.insert(destination.to_string(), Script { delay: Duration::from_millis(delay_ms), result });
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn send(&self, destination: &str, _payload: &Payload) -> std::result::Result<SendReceipt, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.destinations.lock().unwrap().push(destination.to_string());

            let script = self.scripts.get(destination).cloned();
            if let Some(script) = script {
                tokio::time::sleep(script.delay).await;
                script.result?;
            }
            Ok(SendReceipt { id: format!("msg-{destination}"), timestamp: 0 })
        }

        async fn session_status(&self) -> SessionStatus {
            SessionStatus::Ready
        }
    }

    fn dispatcher(client: Arc<dyn ChatClient>) -> FanOutDispatcher {
        FanOutDispatcher::new(client, &MessagingConfig::default())
    }

    fn text(s: &str) -> Payload {
        Payload::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_all_succeed_in_input_order() {
        let client = Arc::new(ScriptedClient::default());
        let report =
            dispatcher(client.clone()).dispatch(&["123-456-7890", "9876543210"], &text("hello")).await.unwrap();

        let outcomes = report.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].recipient(), "1234567890");
        assert_eq!(outcomes[0].input(), "123-456-7890");
        assert_eq!(outcomes[0].status(), DispatchStatus::Success);
        assert_eq!(outcomes[1].recipient(), "9876543210");
        assert_eq!(outcomes[1].status(), DispatchStatus::Success);
        assert_eq!(outcomes[1].receipt().unwrap().id, "msg-9876543210@c.us");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let client = Arc::new(ScriptedClient::default().with("222@c.us", 0, Err(SendError::Timeout)));
        let report = dispatcher(client).dispatch(&["111", "222"], &text("hi")).await.unwrap();

        let outcomes = report.outcomes();
        assert_eq!(outcomes[0].recipient(), "111");
        assert_eq!(outcomes[0].status(), DispatchStatus::Success);
        assert_eq!(outcomes[1].recipient(), "222");
        assert_eq!(outcomes[1].status(), DispatchStatus::Failure);
        assert_eq!(outcomes[1].error().unwrap().code, "network_timeout");
    }

    #[tokio::test]
    async fn test_empty_recipients_rejected_without_sending() {
        let client = Arc::new(ScriptedClient::default());
        let recipients: [&str; 0] = [];
        let result = dispatcher(client.clone()).dispatch(&recipients, &text("hello")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_payload_rejected_without_sending() {
        let client = Arc::new(ScriptedClient::default());
        let result = dispatcher(client.clone()).dispatch(&["111"], &text("")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_recipient_without_digits_fails_alone() {
        let client = Arc::new(ScriptedClient::default());
        let report = dispatcher(client.clone()).dispatch(&["n/a", "+1 555"], &text("hello")).await.unwrap();

        let outcomes = report.outcomes();
        assert_eq!(outcomes[0].input(), "n/a");
        assert_eq!(outcomes[0].error().unwrap().code, "invalid_recipient");
        assert_eq!(outcomes[1].status(), DispatchStatus::Success);
        assert_eq!(client.calls(), 1, "invalid recipient must not reach the chat client");
    }

    #[tokio::test]
    async fn test_duplicates_are_sent_separately() {
        let client = Arc::new(ScriptedClient::default());
        let report = dispatcher(client.clone()).dispatch(&["555-0100", "5550100"], &text("hello")).await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(client.calls(), 2);
        assert_eq!(*client.destinations.lock().unwrap(), vec!["5550100@c.us", "5550100@c.us"]);
    }

    #[tokio::test]
    async fn test_unavailable_session_reported_per_recipient() {
        let client = Arc::new(
            ScriptedClient::default()
                .with("1@c.us", 0, Err(SendError::Unavailable))
                .with("2@c.us", 0, Err(SendError::Unavailable)),
        );
        let report = dispatcher(client).dispatch(&["1", "2"], &text("hello")).await.unwrap();

        assert_eq!(report.failed(), 2);
        assert!(report.outcomes().iter().all(|o| o.error().unwrap().code == "session_unavailable"));
    }

    #[tokio::test]
    async fn test_sends_run_concurrently() {
        #[derive(Debug)]
        struct BarrierClient(tokio::sync::Barrier);

        #[async_trait]
        impl ChatClient for BarrierClient {
            async fn send(&self, destination: &str, _: &Payload) -> std::result::Result<SendReceipt, SendError> {
                // Completes only once every send is in flight at the same time.
                self.0.wait().await;
                Ok(SendReceipt { id: destination.to_string(), timestamp: 0 })
            }

            async fn session_status(&self) -> SessionStatus {
                SessionStatus::Ready
            }
        }

        let recipients: Vec<String> = (0..16).map(|i| format!("{i}")).collect();
        let client = Arc::new(BarrierClient(tokio::sync::Barrier::new(recipients.len())));
        let report = tokio::time::timeout(Duration::from_secs(5), dispatcher(client).dispatch(&recipients, &text("hi")))
            .await
            .expect("sends should not be serialized")
            .unwrap();

        assert_eq!(report.succeeded(), 16);
    }

    #[tokio::test]
    async fn test_order_preserved_under_random_delays_and_failures() {
        let mut rng = rand::thread_rng();

        for _ in 0..10 {
            let mut numbers: Vec<String> = (100..140).map(|n| n.to_string()).collect();
            numbers.shuffle(&mut rng);

            let mut client = ScriptedClient::default();
            let mut expected_failures = Vec::new();
            for n in &numbers {
                let fails = rng.gen_bool(0.3);
                let result = if fails { Err(SendError::Transport("boom".into())) } else { Ok(()) };
                client = client.with(&format!("{n}@c.us"), rng.gen_range(0..15), result);
                expected_failures.push(fails);
            }

            let report = dispatcher(Arc::new(client)).dispatch(&numbers, &text("hello")).await.unwrap();

            assert_eq!(report.len(), numbers.len());
            for ((outcome, number), fails) in report.outcomes().iter().zip(&numbers).zip(&expected_failures) {
                assert_eq!(outcome.recipient(), number);
                assert_eq!(!outcome.is_success(), *fails);
            }
        }
    }
}
