use crate::adapters::storage::{StoredUpload, UploadStore, UploadStream};
use crate::config::UploadConfig;
use crate::domain::dispatch::BatchReport;
use crate::domain::payload::{FileBlob, Payload};
use crate::error::{AppError, Result};
use crate::services::dispatcher::FanOutDispatcher;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) uploaded_bytes: Counter<u64>,
    pub(crate) upload_size_bytes: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("msg-gateway");
        Self {
            uploaded_bytes: meter
                .u64_counter("gateway_uploaded_bytes")
                .with_description("Total bytes of files staged for sending")
                .build(),
            upload_size_bytes: meter
                .u64_histogram("gateway_upload_size_bytes")
                .with_description("Distribution of staged file sizes")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessagingService {
    dispatcher: FanOutDispatcher,
    uploads: Arc<dyn UploadStore>,
    config: UploadConfig,
    metrics: Metrics,
}

impl MessagingService {
    #[must_use]
    pub fn new(dispatcher: FanOutDispatcher, uploads: Arc<dyn UploadStore>, config: UploadConfig) -> Self {
        Self { dispatcher, uploads, config, metrics: Metrics::new() }
    }

    /// Sends a text message to every recipient.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if there are no recipients or the text is empty.
    pub async fn send_text<S: AsRef<str>>(&self, recipients: &[S], text: String) -> Result<BatchReport> {
        self.dispatcher.dispatch(recipients, &Payload::Text(text)).await
    }

    /// Streams an uploaded file into temporary storage.
    ///
    /// # Errors
    /// Returns `AppError::PayloadTooLarge` if the file exceeds the configured limit.
    /// Returns `AppError::Storage` if the file cannot be written.
    pub async fn stage_upload(&self, filename: &str, mime_type: &str, stream: UploadStream<'_>) -> Result<StoredUpload> {
        let upload = self.uploads.save(filename, mime_type, stream, self.config.max_size_bytes).await?;

        self.metrics.uploaded_bytes.add(upload.size, &[]);
        self.metrics.upload_size_bytes.record(upload.size, &[]);

        Ok(upload)
    }

    /// Sends a staged file to every recipient, then deletes it.
    ///
    /// The file is deleted only after every send has settled, and on every
    /// path including validation failures.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if there are no recipients.
    /// Returns `AppError::Storage` if the staged file cannot be read.
    #[tracing::instrument(err(level = "warn"), skip(self, recipients, upload), fields(upload_key = %upload.key))]
    pub async fn send_file<S: AsRef<str>>(&self, recipients: &[S], upload: StoredUpload) -> Result<BatchReport> {
        let result = self.dispatch_upload(recipients, &upload).await;
        self.discard(&upload).await;
        result
    }

    async fn dispatch_upload<S: AsRef<str>>(&self, recipients: &[S], upload: &StoredUpload) -> Result<BatchReport> {
        if recipients.is_empty() {
            return Err(AppError::BadRequest("At least one recipient is required".into()));
        }

        let data = self.uploads.read(upload).await?;
        let payload = Payload::File(FileBlob::new(data, upload.filename.clone(), upload.mime_type.clone()));

        self.dispatcher.dispatch(recipients, &payload).await
    }

    /// Deletes a staged upload. Failures are logged and left for the sweeper.
    pub async fn discard(&self, upload: &StoredUpload) {
        match self.uploads.remove(upload).await {
            Ok(()) => tracing::debug!(upload_key = %upload.key, "Staged upload deleted"),
            Err(e) => tracing::warn!(error = %e, upload_key = %upload.key, "Failed to delete staged upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::chat::ChatClient;
    use crate::adapters::storage::LocalUploadStore;
    use crate::config::MessagingConfig;
    use crate::domain::delivery::{SendError, SendReceipt, SessionStatus};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records whether the staged file was still on disk while each send ran.
    #[derive(Debug)]
    struct FileWatchingClient {
        path: Mutex<Option<PathBuf>>,
        observed: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl ChatClient for FileWatchingClient {
        async fn send(&self, destination: &str, payload: &Payload) -> std::result::Result<SendReceipt, SendError> {
            // Stagger completion so later sends finish after earlier ones.
            let delay = if destination.starts_with('1') { 30 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let path = self.path.lock().unwrap().clone();
            let exists = path.is_some_and(|p| p.exists());
            self.observed.lock().unwrap().push(exists);

            match payload {
                Payload::File(file) if &file.data[..] == b"file body" => {
                    Ok(SendReceipt { id: destination.to_string(), timestamp: 0 })
                }
                _ => Err(SendError::Rejected("unexpected payload".into())),
            }
        }

        async fn session_status(&self) -> SessionStatus {
            SessionStatus::Ready
        }
    }

    async fn setup() -> (tempfile::TempDir, Arc<FileWatchingClient>, MessagingService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(LocalUploadStore::open(dir.path()).await.expect("store"));
        let client = Arc::new(FileWatchingClient { path: Mutex::new(None), observed: Mutex::new(Vec::new()) });
        let dispatcher = FanOutDispatcher::new(client.clone(), &MessagingConfig::default());
        let config = UploadConfig { dir: dir.path().to_path_buf(), ..UploadConfig::default() };
        (dir, client, MessagingService::new(dispatcher, store, config))
    }

    fn body() -> UploadStream<'static> {
        futures::stream::iter(vec![Ok(Bytes::from_static(b"file body"))]).boxed()
    }

    #[tokio::test]
    async fn test_file_stays_readable_until_all_sends_settle() {
        let (dir, client, service) = setup().await;

        let upload = service.stage_upload("doc.txt", "text/plain", body()).await.unwrap();
        let path = dir.path().join(&upload.key);
        *client.path.lock().unwrap() = Some(path.clone());

        let report = service.send_file(&["111", "222", "333"], upload).await.unwrap();

        assert_eq!(report.succeeded(), 3);
        assert_eq!(*client.observed.lock().unwrap(), vec![true, true, true]);
        assert!(!path.exists(), "staged file should be deleted after the batch");
    }

    #[tokio::test]
    async fn test_file_deleted_when_request_is_invalid() {
        let (dir, _client, service) = setup().await;

        let upload = service.stage_upload("doc.txt", "text/plain", body()).await.unwrap();
        let path = dir.path().join(&upload.key);
        let recipients: [&str; 0] = [];

        let result = service.send_file(&recipients, upload).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stage_upload_enforces_limit() {
        let (dir, _client, service) = setup().await;
        let service = MessagingService {
            config: UploadConfig { max_size_bytes: 4, ..service.config.clone() },
            ..service
        };

        let result = service.stage_upload("doc.txt", "text/plain", body()).await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge { limit: 4 })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_send_text_rejects_empty_message() {
        let (_dir, client, service) = setup().await;

        let result = service.send_text(&["111"], String::new()).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(client.observed.lock().unwrap().is_empty());
    }
}
