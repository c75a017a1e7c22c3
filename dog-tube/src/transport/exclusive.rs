use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ConnError, Connection, Reservation};

/// Serializes every operation on a connection that cannot multiplex.
///
/// A reservation holds the lock for up to one poll slice, so publishes and
/// acks issued meanwhile wait behind it.
pub struct Exclusive {
    inner: Arc<dyn Connection>,
    lock: Mutex<()>,
}

impl Exclusive {
    pub fn new(inner: Arc<dyn Connection>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    /// Wrap `conn` only when it does not already allow concurrent use
    pub fn guard(conn: Arc<dyn Connection>) -> Arc<dyn Connection> {
        if conn.is_multiplexed() {
            conn
        } else {
            Arc::new(Self::new(conn))
        }
    }
}

#[async_trait]
impl Connection for Exclusive {
    async fn put(
        &self,
        tube: &str,
        body: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ConnError> {
        let _guard = self.lock.lock().await;
        self.inner.put(tube, body, priority, delay, ttr).await
    }

    async fn reserve_with_timeout(
        &self,
        tubes: &[String],
        timeout: Duration,
    ) -> Result<Reservation, ConnError> {
        let _guard = self.lock.lock().await;
        self.inner.reserve_with_timeout(tubes, timeout).await
    }

    async fn delete(&self, id: u64) -> Result<(), ConnError> {
        let _guard = self.lock.lock().await;
        self.inner.delete(id).await
    }

    async fn release(&self, id: u64, priority: u32, delay: Duration) -> Result<(), ConnError> {
        let _guard = self.lock.lock().await;
        self.inner.release(id, priority, delay).await
    }

    async fn close(&self) -> Result<(), ConnError> {
        let _guard = self.lock.lock().await;
        self.inner.close().await
    }

    fn is_multiplexed(&self) -> bool {
        true
    }
}
