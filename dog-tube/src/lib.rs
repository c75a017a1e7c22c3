//! # dog-tube: Broker-Agnostic Job Queues over Tube Servers
//!
//! A small set of traits ([`Broker`], [`Queue`], [`JobIter`], [`Acknowledger`])
//! and one adapter mapping them onto a tube-based, at-least-once queue with
//! priorities, delayed delivery and a server-side time-to-run per reservation.
//!
//! ## Consumption protocol
//!
//! The tube server can only block a reservation for a bounded slice.
//! [`TubeJobIter::next`](JobIter::next) retries expired slices internally, so
//! callers see one long blocking wait that [`close`](JobIter::close) can end
//! between slices. Every delivered [`Job`] carries an acknowledger and must
//! be acked or rejected exactly once; unacked jobs come back after their
//! time-to-run.
//!
//! ## Quick start
//!
//! ```rust
//! use dog_tube::prelude::*;
//! use dog_tube::transport::MemoryDialer;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> QueueResult<()> {
//! let broker = TubeBroker::connect(&MemoryDialer::default(), "memory", TubeConfig::default()).await?;
//! let queue = broker.queue("emails");
//!
//! let mut job = Job::encode(&("welcome", 42u32))?.with_priority(Priority::NORMAL);
//! queue.publish(&mut job).await?;
//!
//! let jobs = queue.consume()?;
//! let received = jobs.next().await?;
//! let (template, user): (String, u32) = received.decode()?;
//! assert_eq!((template.as_str(), user), ("welcome", 42));
//!
//! received.ack().await?;
//! jobs.close()?;
//! broker.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod job;
pub mod transport;
pub mod types;

pub use backend::tube::{TubeAcknowledger, TubeBroker, TubeJobIter, TubeQueue};
pub use backend::{tx_callback, Acknowledger, Broker, JobIter, Queue, TxCallback};
pub use codec::ContentType;
pub use config::TubeConfig;
pub use error::{QueueError, QueueResult};
pub use job::Job;
pub use types::{DeliveryTag, JobId, Priority, QueueCapabilities};

/// Everything needed to publish and consume jobs
pub mod prelude {
    pub use crate::{
        Acknowledger, Broker, Job, JobIter, Queue, TubeBroker, TubeConfig
    };

    pub use crate::{
        ContentType, JobId, Priority, QueueCapabilities, QueueError, QueueResult
    };

    pub use async_trait::async_trait;
}
