use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{
    backend::Acknowledger,
    codec::ContentType,
    DeliveryTag, JobId, Priority, QueueError, QueueResult,
};

/// A unit of work travelling through a queue.
///
/// Jobs built by a producer carry only a payload and a priority; the broker
/// assigns `id` on publish. Jobs handed out by a [`JobIter`](crate::JobIter)
/// also carry an acknowledger and must be acked or rejected exactly once.
pub struct Job {
    /// String form of the delivery tag, `None` until published or reserved
    pub id: Option<JobId>,
    pub priority: Priority,
    tag: Option<DeliveryTag>,
    payload: Vec<u8>,
    content_type: ContentType,
    acknowledger: Option<Arc<dyn Acknowledger>>,
}

impl Job {
    /// Create a job from already serialized bytes
    pub fn new(payload: impl Into<Vec<u8>>, content_type: ContentType) -> Self {
        Self {
            id: None,
            priority: Priority::default(),
            tag: None,
            payload: payload.into(),
            content_type,
            acknowledger: None,
        }
    }

    /// Serialize `value` as MessagePack into a new job
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> QueueResult<Self> {
        Self::encode_as(ContentType::MsgPack, value)
    }

    pub fn encode_as<T: Serialize + ?Sized>(content_type: ContentType, value: &T) -> QueueResult<Self> {
        Ok(Self::new(content_type.encode(value)?, content_type))
    }

    /// Build a job handed out by a reservation
    pub fn from_delivery(
        tag: DeliveryTag,
        payload: Vec<u8>,
        content_type: ContentType,
        acknowledger: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            id: Some(JobId::from(tag)),
            priority: Priority::default(),
            tag: Some(tag),
            payload,
            content_type,
            acknowledger: Some(acknowledger),
        }
    }

    /// Set the job priority
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Record the tag the broker assigned on publish
    pub fn mark_published(&mut self, tag: DeliveryTag) {
        self.tag = Some(tag);
        self.id = Some(JobId::from(tag));
    }

    pub(crate) fn tag(&self) -> Option<DeliveryTag> {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Deserialize the payload according to its content type
    pub fn decode<T: DeserializeOwned>(&self) -> QueueResult<T> {
        self.content_type.decode(&self.payload)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// True for jobs obtained from a job iterator
    pub fn is_delivered(&self) -> bool {
        self.acknowledger.is_some()
    }

    pub fn acknowledger(&self) -> Option<&Arc<dyn Acknowledger>> {
        self.acknowledger.as_ref()
    }

    /// Mark the job as processed; the broker removes it
    pub async fn ack(&self) -> QueueResult<()> {
        self.acknowledger.as_ref().ok_or(QueueError::CantAck)?.ack().await
    }

    /// Give the job back, requeued for another consumer or discarded
    pub async fn reject(&self, requeue: bool) -> QueueResult<()> {
        self.acknowledger
            .as_ref()
            .ok_or(QueueError::CantAck)?
            .reject(requeue)
            .await
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("content_type", &self.content_type)
            .field("payload_len", &self.payload.len())
            .field("delivered", &self.is_delivered())
            .finish()
    }
}
