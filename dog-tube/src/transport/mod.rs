//! Transport contract consumed by the tube adapter.
//!
//! A [`Connection`] models the handful of tube-server primitives the adapter
//! needs: put, reserve-with-timeout, delete, release and close. How those
//! travel over the wire is the transport's business.

pub mod exclusive;
#[cfg(feature = "memory")]
pub mod memory;

pub use exclusive::Exclusive;
#[cfg(feature = "memory")]
pub use memory::{MemoryConnection, MemoryDialer, MemoryJobState, MemoryServer};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Operation name reported by a reservation that ran out its slice
pub const OP_RESERVE_WITH_TIMEOUT: &str = "reserve-with-timeout";

/// What went wrong inside a transport operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnErrorKind {
    /// No job became available within the requested slice
    Timeout,
    /// The job id is unknown or not in a state allowing the operation
    NotFound,
    /// The connection was closed
    Closed,
    /// The server refused the connection or the command
    Refused(String),
    /// Any other I/O failure
    Io(String),
}

impl fmt::Display for ConnErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::NotFound => write!(f, "not found"),
            Self::Closed => write!(f, "connection closed"),
            Self::Refused(msg) => write!(f, "refused: {}", msg),
            Self::Io(msg) => write!(f, "io: {}", msg),
        }
    }
}

/// Error returned by a transport operation, tagged with the operation name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op}: {kind}")]
pub struct ConnError {
    pub op: &'static str,
    pub kind: ConnErrorKind,
}

impl ConnError {
    pub fn new(op: &'static str, kind: ConnErrorKind) -> Self {
        Self { op, kind }
    }

    /// Timeout reported by a reservation slice
    pub fn reserve_timeout() -> Self {
        Self::new(OP_RESERVE_WITH_TIMEOUT, ConnErrorKind::Timeout)
    }

    /// True only when a reservation slice expired with no job and no other error
    pub fn is_reserve_timeout(&self) -> bool {
        self.op == OP_RESERVE_WITH_TIMEOUT && self.kind == ConnErrorKind::Timeout
    }
}

/// A job handed out by a successful reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: u64,
    pub body: Vec<u8>,
}

/// Tube server primitives shared by queues, iterators and acknowledgers
#[async_trait]
pub trait Connection: Send + Sync {
    /// Store a job on `tube`, returning the server-assigned id
    async fn put(
        &self,
        tube: &str,
        body: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ConnError>;

    /// Reserve a job from any of `tubes`, blocking at most `timeout`
    async fn reserve_with_timeout(
        &self,
        tubes: &[String],
        timeout: Duration,
    ) -> Result<Reservation, ConnError>;

    /// Permanently remove a job
    async fn delete(&self, id: u64) -> Result<(), ConnError>;

    /// Put a reserved job back into the ready (or delayed) pool
    async fn release(&self, id: u64, priority: u32, delay: Duration) -> Result<(), ConnError>;

    async fn close(&self) -> Result<(), ConnError>;

    /// Whether concurrent operations may be issued without external locking
    fn is_multiplexed(&self) -> bool {
        false
    }
}

/// Establishes connections to a tube server
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: &str) -> Result<Arc<dyn Connection>, ConnError>;
}

/// Dial `addr`, retrying up to `retries` more times with a fixed `delay`
pub async fn dial_with_retry(
    dialer: &dyn Dialer,
    addr: &str,
    retries: u32,
    delay: Duration,
) -> Result<Arc<dyn Connection>, ConnError> {
    let mut attempt = 0;
    loop {
        match dialer.dial(addr).await {
            Ok(conn) => {
                debug!("Dialed {} after {} attempt(s)", addr, attempt + 1);
                return Ok(conn);
            }
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!("Dial {} failed ({}), retry {}/{} in {:?}", addr, e, attempt, retries, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
