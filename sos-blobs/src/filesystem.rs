use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use sos_core::BlobId;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::store::{BlobStore, StoreError};

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".tmp";

/// Stores every blob as one file named after its id, directly beneath a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Opens the store at `root`, creating the directory when it does not exist yet.
    ///
    /// Calling this repeatedly for the same path is harmless.
    pub async fn setup(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .await
            .map_err(StoreError::io(root))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(StoreError::io(root))?;
        debug!(root = %root.display(), "filesystem blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an id onto its file, refusing anything which is not a single plain path segment.
    pub fn blob_path(&self, id: &BlobId) -> Result<PathBuf, StoreError> {
        let mut components = Path::new(id.as_str()).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(StoreError::OutsideRoot(self.root.join(id.as_str()))),
        }
    }

    fn temp_path(&self, id: &BlobId) -> PathBuf {
        let nonce: u64 = rand::random();
        self.root
            .join(format!("{TEMP_PREFIX}{id}.{nonce:016x}{TEMP_SUFFIX}"))
    }

    async fn write_temp(path: &Path, content: &[u8]) -> Result<(), StoreError> {
        let mut file = fs::File::create(path).await.map_err(StoreError::io(path))?;
        file.write_all(content).await.map_err(StoreError::io(path))?;
        file.sync_all().await.map_err(StoreError::io(path))?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn get(&self, id: &BlobId) -> Result<Option<Bytes>, StoreError> {
        let path = self.blob_path(id)?;
        match fs::read(&path).await {
            Ok(content) => {
                trace!(%id, bytes = content.len(), "read blob");
                Ok(Some(Bytes::from(content)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(path)(err)),
        }
    }

    async fn store(&self, id: &BlobId, content: Bytes) -> Result<(), StoreError> {
        let path = self.blob_path(id)?;

        // Concurrent writers of the same id each rename a complete file into place, last one wins.
        let temp_path = self.temp_path(id);
        if let Err(err) = Self::write_temp(&temp_path, &content).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(err);
        }
        if let Err(err) = fs::rename(&temp_path, &path).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(StoreError::io(path)(err));
        }

        trace!(%id, bytes = content.len(), "stored blob");
        Ok(())
    }

    async fn existing(&self) -> Result<Vec<BlobId>, StoreError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(StoreError::io(&self.root))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io(&self.root))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(StoreError::io(entry.path()))?
                .is_file();
            if !is_file {
                continue;
            }
            // Skips temporary files of in-flight writes and anything not written by us.
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| BlobId::from_str(name).ok())
            else {
                continue;
            };
            ids.push(id);
        }

        Ok(ids)
    }
}
