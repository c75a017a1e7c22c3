pub mod tube;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;

use crate::{Job, QueueCapabilities, QueueResult};

/// Callback run inside [`Queue::transaction`]; every publish it makes through
/// the given queue either commits together or not at all
pub type TxCallback = Box<dyn for<'a> FnOnce(&'a dyn Queue) -> BoxFuture<'a, QueueResult<()>> + Send>;

/// Box a closure as a [`TxCallback`], letting the compiler infer its signature
pub fn tx_callback<F>(callback: F) -> TxCallback
where
    F: for<'a> FnOnce(&'a dyn Queue) -> BoxFuture<'a, QueueResult<()>> + Send + 'static,
{
    Box::new(callback)
}

/// Owns a broker connection and hands out named queues
#[async_trait]
pub trait Broker: Send + Sync {
    /// Get a handle to the queue called `name`; performs no I/O
    fn queue(&self, name: &str) -> Box<dyn Queue>;

    /// Release the underlying connection
    async fn close(&self) -> QueueResult<()>;
}

/// A named queue on a broker
#[async_trait]
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    /// Publish `job` for immediate delivery, setting its id from the broker
    async fn publish(&self, job: &mut Job) -> QueueResult<()>;

    /// Publish `job` so it can only be reserved once `delay` has elapsed
    async fn publish_delayed(&self, job: &mut Job, delay: Duration) -> QueueResult<()>;

    /// Publish several jobs atomically (optional capability)
    async fn transaction(&self, callback: TxCallback) -> QueueResult<()>;

    /// Start consuming; never blocks and never reserves by itself
    fn consume(&self) -> QueueResult<Box<dyn JobIter>>;

    fn capabilities(&self) -> QueueCapabilities;
}

/// Blocking, cancellable stream of jobs from one queue
#[async_trait]
pub trait JobIter: Send + Sync {
    /// Wait for the next job.
    ///
    /// Only returns once a job was reserved or a definite error happened;
    /// fails with [`QueueError::AlreadyClosed`](crate::QueueError::AlreadyClosed)
    /// after [`close`](JobIter::close).
    async fn next(&self) -> QueueResult<Job>;

    /// Stop the iterator. A reservation already in flight is not interrupted.
    fn close(&self) -> QueueResult<()>;
}

/// Settles a single delivery
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// The job was processed and can be removed
    async fn ack(&self) -> QueueResult<()>;

    /// The job was not processed; `requeue` makes it available again
    async fn reject(&self, requeue: bool) -> QueueResult<()>;
}
