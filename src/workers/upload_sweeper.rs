use crate::adapters::storage::UploadStore;
use crate::config::UploadConfig;
use crate::error::Result;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    deleted: Counter<u64>,
    errors: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("msg-gateway");
        Self {
            deleted: meter
                .u64_counter("gateway_orphaned_uploads_deleted_total")
                .with_description("Total number of orphaned uploads removed from the upload directory")
                .build(),
            errors: meter
                .u64_counter("gateway_upload_sweep_errors_total")
                .with_description("Total number of failed upload sweep cycles")
                .build(),
        }
    }
}

/// Periodically deletes staged uploads that outlived their request, e.g. after a crash mid-send.
#[derive(Debug)]
pub struct UploadSweeper {
    uploads: Arc<dyn UploadStore>,
    config: UploadConfig,
    metrics: Metrics,
}

impl UploadSweeper {
    #[must_use]
    pub fn new(uploads: Arc<dyn UploadStore>, config: UploadConfig) -> Self {
        Self { uploads, config, metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut next_tick = tokio::time::Instant::now() + interval;

        while !*shutdown.borrow() {
            tokio::select! {
                () = tokio::time::sleep_until(next_tick) => {
                    async {
                        tracing::debug!("Running upload sweep...");

                        match self.sweep_once().await {
                            Ok(count) => {
                                if count > 0 {
                                    self.metrics.deleted.add(count, &[]);
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Upload sweep cycle failed");
                                self.metrics.errors.add(1, &[]);
                            }
                        }
                    }
                    .instrument(tracing::info_span!("upload_sweep_iteration"))
                    .await;
                    next_tick = tokio::time::Instant::now() + interval;
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Upload sweep loop shutting down...");
    }

    #[tracing::instrument(err, skip(self), fields(deleted_count = tracing::field::Empty))]
    pub(crate) async fn sweep_once(&self) -> Result<u64> {
        let deleted = self.uploads.sweep(Duration::from_secs(self.config.max_age_secs)).await?;
        tracing::Span::current().record("deleted_count", deleted);
        if deleted > 0 {
            tracing::info!(deleted_count = %deleted, "Removed orphaned uploads");
        }
        Ok(deleted)
    }
}
