use bytes::Bytes;
use std::sync::OnceLock;

/// Content delivered to every recipient of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    File(FileBlob),
}

#[derive(Debug, Clone)]
pub struct FileBlob {
    pub data: Bytes,
    pub filename: String,
    pub mime_type: String,
    encoded: OnceLock<Bytes>,
}

impl FileBlob {
    #[must_use]
    pub const fn new(data: Bytes, filename: String, mime_type: String) -> Self {
        Self { data, filename, mime_type, encoded: OnceLock::new() }
    }

    /// Returns the wire encoding of this file, running `encode` only on the first call.
    ///
    /// Every send of a batch borrows the same blob, so they all share one encoded buffer.
    pub fn encoded_with(&self, encode: impl FnOnce(&Self) -> Bytes) -> Bytes {
        self.encoded.get_or_init(|| encode(self)).clone()
    }
}

impl PartialEq for FileBlob {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.filename == other.filename && self.mime_type == other.mime_type
    }
}

impl Eq for FileBlob {}

impl Payload {
    /// Text payloads with no content count as missing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::File(_) => false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::File(_) => "file",
        }
    }
}
