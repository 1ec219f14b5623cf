use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use sos_core::BlobId;

use crate::store::{BlobStore, StoreError};

/// Volatile store keeping all blobs in memory, useful for tests and throwaway nodes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<BlobId, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, id: &BlobId) -> Result<Option<Bytes>, StoreError> {
        Ok(self.blobs.get(id).map(|entry| entry.value().clone()))
    }

    async fn store(&self, id: &BlobId, content: Bytes) -> Result<(), StoreError> {
        self.blobs.insert(id.clone(), content);
        Ok(())
    }

    async fn existing(&self) -> Result<Vec<BlobId>, StoreError> {
        Ok(self.blobs.iter().map(|entry| entry.key().clone()).collect())
    }
}
