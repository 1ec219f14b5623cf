pub mod blob_id;
pub mod digest;

pub use blob_id::{BlobId, InvalidBlobId, is_valid_blob_id, strip_extension};
pub use digest::ContentDigest;
