use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::TubeAcknowledger;
use crate::{
    backend::JobIter,
    codec::ContentType,
    transport::{Connection, Reservation},
    DeliveryTag, Job, QueueError, QueueResult, TubeConfig,
};

/// Job iterator over a set of watched tubes.
///
/// Each reservation blocks for at most one poll slice. Expired slices are
/// retried until a job arrives or the iterator is closed, so `close` takes
/// effect within one slice.
pub struct TubeJobIter {
    conn: Arc<dyn Connection>,
    tubes: Vec<String>,
    poll_slice: Duration,
    closed: AtomicBool,
}

impl TubeJobIter {
    pub fn new(conn: Arc<dyn Connection>, tubes: Vec<String>, config: &TubeConfig) -> Self {
        Self {
            conn,
            tubes,
            poll_slice: config.poll_slice,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn deliver(&self, reservation: Reservation) -> Job {
        let tag = DeliveryTag(reservation.id);
        let acknowledger = TubeAcknowledger::new(tag, self.conn.clone());

        // Producers on tube queues always encode with MessagePack
        Job::from_delivery(tag, reservation.body, ContentType::MsgPack, Arc::new(acknowledger))
    }
}

#[async_trait]
impl JobIter for TubeJobIter {
    async fn next(&self) -> QueueResult<Job> {
        loop {
            if self.is_closed() {
                return Err(QueueError::AlreadyClosed);
            }

            match self.conn.reserve_with_timeout(&self.tubes, self.poll_slice).await {
                Ok(reservation) => {
                    debug!("Reserved job {} from {:?}", reservation.id, self.tubes);
                    return Ok(self.deliver(reservation));
                }
                Err(e) if e.is_reserve_timeout() => {
                    trace!("No job on {:?} within {:?}, polling again", self.tubes, self.poll_slice);
                    // A server may answer an idle reservation without blocking
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&self) -> QueueResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed job iterator on {:?}", self.tubes);
        }
        Ok(())
    }
}
