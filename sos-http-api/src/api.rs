use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use sos_core::BlobId;

use crate::status::UploadStatus;

pub const HTTP_ALIVE_ROUTE: &str = "/alive";
pub const HTTP_BLOBS_ROUTE: &str = "/blob";
pub const HTTP_BLOB_ROUTE: &str = "/blob/{id}";

pub const ALIVE_RESPONSE: &str = "alive";
pub const INVALID_ID_RESPONSE: &str = "Alphanumeric IDs only.";
pub const BLOB_NOT_FOUND_RESPONSE: &str = "404 page not found";
pub const NOT_HOSTED_RESPONSE: &str = "404 - content is not hosted here.";

/// Largest request body accepted for a single blob.
pub const MAX_BLOB_SIZE: usize = 256 * 1024 * 1024;

/// A completed HTTP exchange with a blob-server, kept as-is so it can be relayed.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl NodeResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("blob-server response deserialization")
    }

    pub fn upload_status(&self) -> Result<UploadStatus> {
        self.json()
    }
}

/// Operations of a blob-server as seen by its callers.
///
/// `get_blob` and `put_blob` hand back whatever the blob-server answered, including error
/// statuses. An `Err` always means the exchange itself failed (connection, timeout, bad address).
#[async_trait]
pub trait BlobApi: Send + Sync {
    /// Base address of the blob-server.
    fn endpoint(&self) -> &str;

    async fn alive(&self) -> Result<String>;

    async fn get_blob(&self, id: &str) -> Result<NodeResponse>;

    async fn put_blob(&self, id: &str, content: Bytes) -> Result<NodeResponse>;

    async fn list_blobs(&self) -> Result<Vec<BlobId>>;
}
