use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use sos_core::BlobId;
use tokio::runtime::Runtime;

use crate::api::{BlobApi, NodeResponse};

/// Drives an async [`BlobApi`] from synchronous code on the given runtime.
pub struct BlockingClient<A>
where
    A: BlobApi,
{
    inner: A,
    runtime: Arc<Runtime>,
}

impl<A> BlockingClient<A>
where
    A: BlobApi,
{
    pub fn new(inner: A, runtime: Arc<Runtime>) -> Self {
        Self { inner, runtime }
    }

    pub fn alive(&self) -> Result<String> {
        self.runtime.block_on(async { self.inner.alive().await })
    }

    pub fn get_blob(&self, id: &str) -> Result<NodeResponse> {
        self.runtime.block_on(async { self.inner.get_blob(id).await })
    }

    pub fn put_blob(&self, id: &str, content: impl Into<Bytes>) -> Result<NodeResponse> {
        let content = content.into();
        self.runtime
            .block_on(async { self.inner.put_blob(id, content).await })
    }

    pub fn list_blobs(&self) -> Result<Vec<BlobId>> {
        self.runtime.block_on(async { self.inner.list_blobs().await })
    }
}
