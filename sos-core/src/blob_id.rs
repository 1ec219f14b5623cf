use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EXTENSION_DELIMITER: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Alphanumeric IDs only.")]
pub struct InvalidBlobId(pub String);

/// Returns true if the key is safe to use as a single filesystem path segment.
///
/// Only non-empty strings made of lowercase ASCII letters and digits pass, which rules out
/// separators, dots, whitespace and anything that would need escaping.
pub fn is_valid_blob_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit())
}

/// Removes a trailing filename extension, from the last `.` onwards.
///
/// `abc123.jpg` becomes `abc123`, `abc.tar.gz` becomes `abc.tar` and a value without a dot is
/// returned untouched.
pub fn strip_extension(value: &str) -> &str {
    match value.rfind(EXTENSION_DELIMITER) {
        Some(index) => &value[..index],
        None => value,
    }
}

/// Identifier of a blob held by a storage node.
///
/// Can only be constructed from a string passing [`is_valid_blob_id`], so holding a `BlobId`
/// means it maps onto exactly one file name beneath a store root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId(String);

impl BlobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for BlobId {
    type Err = InvalidBlobId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !is_valid_blob_id(value) {
            return Err(InvalidBlobId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for BlobId {
    type Error = InvalidBlobId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if !is_valid_blob_id(&value) {
            return Err(InvalidBlobId(value));
        }
        Ok(Self(value))
    }
}

impl Serialize for BlobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: String = String::deserialize(deserializer)?;
        Self::try_from(value).map_err(|err| serde::de::Error::custom(err.to_string()))
    }
}
