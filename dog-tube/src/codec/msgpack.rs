use serde::{de::DeserializeOwned, Serialize};

use crate::QueueResult;

/// MIME type of MessagePack payloads
pub const CONTENT_TYPE: &str = "application/msgpack";

/// Encode a value as MessagePack, keeping struct field names
pub fn encode<T: Serialize + ?Sized>(value: &T) -> QueueResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> QueueResult<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}
