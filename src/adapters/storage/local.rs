use crate::adapters::storage::{StoredUpload, UploadStore, UploadStream};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Stages uploads as plain files in a single directory.
#[derive(Clone, Debug)]
pub struct LocalUploadStore {
    dir: PathBuf,
}

impl LocalUploadStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

/// Reduces a client-supplied filename to a safe single path component.
fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename).file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let cleaned: String =
        base.chars().map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }).collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() { "upload".to_string() } else { cleaned.to_string() }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        tracing::warn!(error = %e, path = %path.display(), "Failed to remove partial upload");
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    #[tracing::instrument(err(level = "warn"), skip(self, stream), fields(upload_key = tracing::field::Empty))]
    async fn save(
        &self,
        filename: &str,
        mime_type: &str,
        mut stream: UploadStream<'_>,
        max_size: usize,
    ) -> Result<StoredUpload> {
        let key = format!("{}-{}", Uuid::now_v7(), sanitize_filename(filename));
        tracing::Span::current().record("upload_key", key.as_str());
        let path = self.path_for(&key);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut total: usize = 0;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    drop(file);
                    discard_partial(&path).await;
                    return Err(AppError::Storage(e));
                }
            };

            total += bytes.len();
            if total > max_size {
                drop(file);
                discard_partial(&path).await;
                return Err(AppError::PayloadTooLarge { limit: max_size });
            }

            if let Err(e) = file.write_all(&bytes).await {
                drop(file);
                discard_partial(&path).await;
                return Err(AppError::Storage(e));
            }
        }

        file.flush().await?;
        tracing::debug!(size = total, "Upload staged");

        Ok(StoredUpload {
            key,
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: u64::try_from(total).unwrap_or(u64::MAX),
        })
    }

    async fn read(&self, upload: &StoredUpload) -> Result<Bytes> {
        let data = tokio::fs::read(self.path_for(&upload.key)).await?;
        Ok(Bytes::from(data))
    }

    async fn remove(&self, upload: &StoredUpload) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(&upload.key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(upload_key = %upload.key, "Upload already removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sweep(&self, older_than: Duration) -> Result<u64> {
        let now = SystemTime::now();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, path = %entry.path().display(), "Failed to stat staged upload");
                    continue;
                }
            };

            let age = metadata.modified().ok().and_then(|modified| now.duration_since(modified).ok());
            if age.is_some_and(|age| age > older_than) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(error = %e, path = %entry.path().display(), "Failed to remove orphaned upload");
                    }
                }
            }
        }

        Ok(removed)
    }

    async fn check(&self) -> Result<()> {
        let probe = self.path_for(&format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}
