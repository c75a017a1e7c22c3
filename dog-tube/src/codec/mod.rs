//! Payload serialization formats.
//!
//! The queue itself only carries a [`ContentType`] tag next to the raw bytes;
//! producers and consumers agree on the format through it.

pub mod msgpack;
#[cfg(feature = "json")]
pub mod json;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{QueueError, QueueResult};

/// Serialization format of a job payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// MessagePack, the format producers on tube queues use
    #[default]
    MsgPack,
    #[cfg(feature = "json")]
    Json,
}

impl ContentType {
    /// Get the MIME identifier
    pub fn mime(self) -> &'static str {
        match self {
            Self::MsgPack => msgpack::CONTENT_TYPE,
            #[cfg(feature = "json")]
            Self::Json => json::CONTENT_TYPE,
        }
    }

    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> QueueResult<Vec<u8>> {
        match self {
            Self::MsgPack => msgpack::encode(value),
            #[cfg(feature = "json")]
            Self::Json => json::encode(value),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> QueueResult<T> {
        match self {
            Self::MsgPack => msgpack::decode(bytes),
            #[cfg(feature = "json")]
            Self::Json => json::decode(bytes),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ContentType {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            msgpack::CONTENT_TYPE => Ok(Self::MsgPack),
            #[cfg(feature = "json")]
            json::CONTENT_TYPE => Ok(Self::Json),
            other => Err(QueueError::UnsupportedContentType(other.to_string())),
        }
    }
}
