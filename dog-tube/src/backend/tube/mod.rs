//! Tube-server adapter: at-least-once delivery with priorities, delayed
//! jobs and a server-side time-to-run per reservation.

mod ack;
mod iter;
#[cfg(test)]
pub(crate) mod testing;

pub use ack::TubeAcknowledger;
pub use iter::TubeJobIter;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::{
    backend::{Broker, JobIter, Queue, TxCallback},
    codec::ContentType,
    transport::{dial_with_retry, Connection, Dialer, Exclusive},
    DeliveryTag, Job, QueueCapabilities, QueueError, QueueResult, TubeConfig,
};

/// Broker backed by a single tube-server connection
pub struct TubeBroker {
    conn: Arc<dyn Connection>,
    config: Arc<TubeConfig>,
}

impl TubeBroker {
    /// Dial `addr`, retrying per `config`, and wrap the connection
    #[instrument(skip(dialer, config))]
    pub async fn connect(dialer: &dyn Dialer, addr: &str, config: TubeConfig) -> QueueResult<Self> {
        let conn = dial_with_retry(dialer, addr, config.dial_retries, config.dial_delay)
            .await
            .map_err(|e| QueueError::connection(addr, e))?;

        info!("Connected to tube server at {}", addr);
        Ok(Self::from_connection(conn, config))
    }

    /// Use an already established connection
    pub fn from_connection(conn: Arc<dyn Connection>, config: TubeConfig) -> Self {
        Self {
            conn: Exclusive::guard(conn),
            config: Arc::new(config),
        }
    }

    /// Typed handle to the tube called `name`
    pub fn tube(&self, name: &str) -> TubeQueue {
        TubeQueue {
            name: name.to_string(),
            conn: self.conn.clone(),
            config: self.config.clone(),
        }
    }
}

#[async_trait]
impl Broker for TubeBroker {
    fn queue(&self, name: &str) -> Box<dyn Queue> {
        Box::new(self.tube(name))
    }

    async fn close(&self) -> QueueResult<()> {
        self.conn.close().await?;
        info!("Tube broker connection closed");
        Ok(())
    }
}

/// A named tube; cheap to clone, all clones share the broker connection
#[derive(Clone)]
pub struct TubeQueue {
    name: String,
    conn: Arc<dyn Connection>,
    config: Arc<TubeConfig>,
}

impl TubeQueue {
    #[instrument(skip(self, job), fields(tube = %self.name, priority = job.priority.value()))]
    async fn put(&self, job: &mut Job, delay: Duration) -> QueueResult<()> {
        if job.is_empty() {
            return Err(QueueError::EmptyJob);
        }
        // Deliveries carry no content type, consumers always decode MessagePack
        if job.content_type() != ContentType::MsgPack {
            return Err(QueueError::UnsupportedContentType(job.content_type().to_string()));
        }

        let id = self
            .conn
            .put(&self.name, job.payload(), job.priority.value(), delay, self.config.time_to_run)
            .await?;
        job.mark_published(DeliveryTag(id));

        debug!("Published job {:?} with delay {:?}", job.tag(), delay);
        Ok(())
    }

    /// Iterator over this tube with its concrete type
    pub fn iter(&self) -> TubeJobIter {
        TubeJobIter::new(self.conn.clone(), vec![self.name.clone()], &self.config)
    }
}

#[async_trait]
impl Queue for TubeQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, job: &mut Job) -> QueueResult<()> {
        self.put(job, Duration::ZERO).await
    }

    async fn publish_delayed(&self, job: &mut Job, delay: Duration) -> QueueResult<()> {
        self.put(job, delay).await
    }

    async fn transaction(&self, _callback: TxCallback) -> QueueResult<()> {
        debug!("Transaction requested on tube {}, not supported", self.name);
        Err(QueueError::TransactionNotSupported)
    }

    fn consume(&self) -> QueueResult<Box<dyn JobIter>> {
        Ok(Box::new(self.iter()))
    }

    fn capabilities(&self) -> QueueCapabilities {
        QueueCapabilities {
            delayed: true,
            priority: true,
            transactions: false,
            requeue: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Call, ScriptedConnection};
    use super::*;
    use crate::Priority;
    use futures::FutureExt;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn broker(conn: &Arc<ScriptedConnection>) -> TubeBroker {
        TubeBroker::from_connection(conn.clone(), TubeConfig::default())
    }

    #[tokio::test]
    async fn publish_sets_id_from_broker_tag() {
        let conn = Arc::new(ScriptedConnection::with_put_ids([42]));
        let queue = broker(&conn).queue("emails");
        let mut job = Job::new(b"hello".to_vec(), ContentType::MsgPack).with_priority(Priority(5));

        queue.publish(&mut job).await.unwrap();

        assert_eq!(job.id.as_ref().map(|id| id.as_str()), Some("42"));
        assert_eq!(job.tag(), Some(DeliveryTag(42)));
        assert!(!job.is_delivered());
        assert_eq!(
            conn.calls(),
            vec![Call::Put {
                tube: "emails".into(),
                body: b"hello".to_vec(),
                priority: 5,
                delay: Duration::ZERO,
                ttr: Duration::from_secs(60),
            }]
        );
    }

    #[tokio::test]
    async fn publish_delayed_passes_delay_and_sets_id() {
        let conn = Arc::new(ScriptedConnection::with_put_ids([9]));
        let queue = broker(&conn).queue("emails");
        let mut job = Job::new(b"later".to_vec(), ContentType::MsgPack);

        queue.publish_delayed(&mut job, Duration::from_secs(30)).await.unwrap();

        assert_eq!(job.id.as_ref().map(|id| id.as_str()), Some("9"));
        assert!(matches!(
            conn.calls().as_slice(),
            [Call::Put { delay, .. }] if *delay == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn empty_job_is_rejected_without_io() {
        let conn = Arc::new(ScriptedConnection::default());
        let queue = broker(&conn).queue("emails");
        let mut job = Job::new(Vec::new(), ContentType::MsgPack);

        assert!(matches!(queue.publish(&mut job).await, Err(QueueError::EmptyJob)));
        assert!(matches!(
            queue.publish_delayed(&mut job, Duration::from_secs(1)).await,
            Err(QueueError::EmptyJob)
        ));
        assert!(job.id.is_none());
        assert!(conn.calls().is_empty());
    }

    #[cfg(feature = "json")]
    #[tokio::test]
    async fn non_msgpack_job_is_rejected_without_io() {
        let conn = Arc::new(ScriptedConnection::default());
        let queue = broker(&conn).queue("emails");
        let mut job = Job::encode_as(ContentType::Json, &("hi", 1u32)).unwrap();

        let err = queue.publish(&mut job).await.unwrap_err();

        assert!(matches!(err, QueueError::UnsupportedContentType(ref ct) if ct == "application/json"));
        assert!(job.id.is_none());
        assert!(conn.calls().is_empty());
    }

    #[tokio::test]
    async fn put_errors_pass_through() {
        let conn = Arc::new(ScriptedConnection::default());
        conn.fail_puts(crate::transport::ConnError::new(
            "put",
            crate::transport::ConnErrorKind::Io("broken pipe".into()),
        ));
        let queue = broker(&conn).queue("emails");
        let mut job = Job::new(b"x".to_vec(), ContentType::MsgPack);

        let err = queue.publish(&mut job).await.unwrap_err();

        assert_eq!(err.to_string(), "put: io: broken pipe");
        assert!(job.id.is_none());
    }

    #[tokio::test]
    async fn transaction_is_not_supported() {
        let conn = Arc::new(ScriptedConnection::default());
        let queue = broker(&conn).queue("emails");
        let invoked = Arc::new(AtomicBool::new(false));

        let flag = invoked.clone();
        let result = queue
            .transaction(crate::backend::tx_callback(move |q| {
                flag.store(true, Ordering::SeqCst);
                async move {
                    let mut job = Job::new(b"x".to_vec(), ContentType::MsgPack);
                    q.publish(&mut job).await
                }
                .boxed()
            }))
            .await;

        assert!(matches!(result, Err(QueueError::TransactionNotSupported)));
        assert!(!invoked.load(Ordering::SeqCst));
        assert!(conn.calls().is_empty());
        assert!(!queue.capabilities().transactions);
    }

    #[tokio::test]
    async fn queue_and_consume_do_no_io() {
        let conn = Arc::new(ScriptedConnection::default());
        let broker = broker(&conn);

        let queue = broker.queue("emails");
        let _iter = queue.consume().unwrap();

        assert_eq!(queue.name(), "emails");
        assert!(conn.calls().is_empty());
    }

    #[tokio::test]
    async fn close_releases_connection() {
        let conn = Arc::new(ScriptedConnection::default());
        broker(&conn).close().await.unwrap();
        assert_eq!(conn.calls(), vec![Call::Close]);
    }

    proptest! {
        #[test]
        fn accepted_publish_always_assigns_id(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            priority in any::<u32>(),
            tag in any::<u64>(),
        ) {
            let conn = Arc::new(ScriptedConnection::with_put_ids([tag]));
            let queue = broker(&conn).queue("props");
            let mut job = Job::new(payload, ContentType::MsgPack).with_priority(Priority(priority));

            tokio_test::block_on(queue.publish(&mut job)).unwrap();

            let id = job.id.clone().unwrap();
            prop_assert!(!id.as_str().is_empty());
            prop_assert_eq!(id.as_str(), tag.to_string());
            prop_assert_eq!(job.tag(), Some(DeliveryTag(tag)));
        }
    }
}
