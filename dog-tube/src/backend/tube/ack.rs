use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{backend::Acknowledger, transport::Connection, DeliveryTag, QueueResult};

/// Priority a requeued job is released with
const RELEASE_PRIORITY: u32 = 0;

/// Settles one reserved job on the tube server.
///
/// Calls are passed straight to the server: acking twice, or rejecting after
/// an ack, returns whatever the server reports for a job it no longer holds.
pub struct TubeAcknowledger {
    tag: DeliveryTag,
    conn: Arc<dyn Connection>,
}

impl TubeAcknowledger {
    pub fn new(tag: DeliveryTag, conn: Arc<dyn Connection>) -> Self {
        Self { tag, conn }
    }
}

#[async_trait]
impl Acknowledger for TubeAcknowledger {
    async fn ack(&self) -> QueueResult<()> {
        self.conn.delete(self.tag.value()).await?;
        debug!("Deleted job {}", self.tag);
        Ok(())
    }

    /// Without `requeue` the job is deleted, exactly like [`ack`](Self::ack).
    /// With it, the job goes back to ready at priority 0, no delay.
    async fn reject(&self, requeue: bool) -> QueueResult<()> {
        if !requeue {
            return self.ack().await;
        }

        self.conn
            .release(self.tag.value(), RELEASE_PRIORITY, Duration::ZERO)
            .await?;
        debug!("Released job {} at priority {}", self.tag, RELEASE_PRIORITY);
        Ok(())
    }
}
