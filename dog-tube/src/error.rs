use thiserror::Error;

use crate::transport::ConnError;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors surfaced by brokers, queues, iterators and acknowledgers
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// Publish was attempted with an empty payload; nothing was sent
    #[error("invalid empty job")]
    EmptyJob,

    /// The queue cannot publish several jobs atomically
    #[error("transactions not supported")]
    TransactionNotSupported,

    /// The job iterator was used after `close`
    #[error("already closed")]
    AlreadyClosed,

    /// Ack/reject was called on a job that was never delivered
    #[error("can't acknowledge this job")]
    CantAck,

    /// Dialing the broker failed after every retry
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: ConnError,
    },

    /// Failure reported by the transport, passed through untouched
    #[error(transparent)]
    Transport(#[from] ConnError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

impl QueueError {
    /// Build a connection error for the given address
    pub fn connection(addr: impl Into<String>, source: ConnError) -> Self {
        Self::Connection {
            addr: addr.into(),
            source,
        }
    }

    /// The transport error behind this failure, if any
    pub fn transport(&self) -> Option<&ConnError> {
        match self {
            Self::Transport(err) | Self::Connection { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<rmp_serde::encode::Error> for QueueError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for QueueError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
