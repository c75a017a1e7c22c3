use serde::{de::DeserializeOwned, Serialize};

use crate::QueueResult;

/// MIME type of JSON payloads
pub const CONTENT_TYPE: &str = "application/json";

pub fn encode<T: Serialize + ?Sized>(value: &T) -> QueueResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> QueueResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
