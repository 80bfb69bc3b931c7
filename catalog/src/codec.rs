//! Cache keys and the byte encoding of cached entities.

use crate::domain::EntityKind;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

impl From<CodecError> for shared::Error {
    fn from(err: CodecError) -> Self {
        shared::Error::Internal(err.to_string())
    }
}

/// `"{prefix}:{natural key}"`
pub fn cache_key(kind: EntityKind, id: i32) -> String {
    format!("{}:{}", kind.prefix(), id)
}

/// Pattern matching every key of one entity type.
pub fn key_pattern(kind: EntityKind) -> String {
    format!("{}:*", kind.prefix())
}

/// Key of the id list that records which entities make up a complete set.
/// Never matched by [`key_pattern`].
pub fn index_key(kind: EntityKind) -> String {
    format!("{}_index", kind.prefix())
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, CodecError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
