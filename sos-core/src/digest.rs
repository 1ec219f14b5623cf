use std::fmt;

use sha1::{Digest, Sha1};

use crate::BlobId;

/// SHA-1 digest of a blob's content.
///
/// The lowercase hex rendering is the canonical identifier the proxy assigns to uploaded content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 20]);

impl ContentDigest {
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(content);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex digests only contain `[0-9a-f]` and always form a valid blob id.
    pub fn to_blob_id(&self) -> BlobId {
        self.to_hex()
            .try_into()
            .unwrap_or_else(|_| unreachable!("hex digest is always a valid blob id"))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
