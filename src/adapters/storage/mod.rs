use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;

pub mod local;

pub use local::LocalUploadStore;

pub type UploadStream<'a> = BoxStream<'a, std::result::Result<Bytes, std::io::Error>>;

/// A file staged by [`UploadStore::save`], addressed by its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub key: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

#[async_trait]
pub trait UploadStore: Send + Sync + std::fmt::Debug + 'static {
    /// Streams an upload into storage, failing with `AppError::PayloadTooLarge` past `max_size` bytes.
    async fn save(
        &self,
        filename: &str,
        mime_type: &str,
        stream: UploadStream<'_>,
        max_size: usize,
    ) -> Result<StoredUpload>;
    async fn read(&self, upload: &StoredUpload) -> Result<Bytes>;
    async fn remove(&self, upload: &StoredUpload) -> Result<()>;
    /// Removes every staged file older than `older_than` and returns how many were deleted.
    async fn sweep(&self, older_than: Duration) -> Result<u64>;
    async fn check(&self) -> Result<()>;
}
