use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use sos_core::BlobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path {0} is outside of the store root")]
    OutsideRoot(PathBuf),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

/// Storage capability of a blob node.
///
/// Backends are set up by their constructor; afterwards every operation only ever addresses blobs
/// through a validated [`BlobId`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the blob content or `None` when no blob with this id exists.
    async fn get(&self, id: &BlobId) -> Result<Option<Bytes>, StoreError>;

    /// Creates or replaces the blob with the given content.
    async fn store(&self, id: &BlobId, content: Bytes) -> Result<(), StoreError>;

    /// Lists the ids of all stored blobs, in no particular order.
    async fn existing(&self) -> Result<Vec<BlobId>, StoreError>;
}
