use serde::{Deserialize, Serialize};
use sos_core::BlobId;

pub const UPLOAD_STATUS_OK: &str = "OK";

/// Body of a successful blob upload, e.g. `{"id":"abc","status":"OK","size":3}`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct UploadStatus {
    pub id: BlobId,
    pub status: String,
    pub size: u64,
}

impl UploadStatus {
    pub fn ok(id: BlobId, size: u64) -> Self {
        UploadStatus {
            id,
            status: UPLOAD_STATUS_OK.to_string(),
            size,
        }
    }
}
