use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::{ConnError, ConnErrorKind, Connection, Dialer, Reservation, OP_RESERVE_WITH_TIMEOUT};

/// Smallest time-to-run handed out; a zero budget would requeue on reserve
const MIN_TTR: Duration = Duration::from_secs(1);

/// Externally visible state of a stored job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryJobState {
    Ready,
    Delayed,
    Reserved,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Ready,
    Delayed { until: Instant },
    Reserved { deadline: Instant },
}

struct StoredJob {
    tube: String,
    priority: u32,
    body: Vec<u8>,
    ttr: Duration,
    slot: Slot,
}

#[derive(Default)]
struct ServerState {
    last_id: u64,
    jobs: HashMap<u64, StoredJob>,
    /// tube -> (priority, id); lowest priority value first, then oldest id
    ready: HashMap<String, BTreeSet<(u32, u64)>>,
}

impl ServerState {
    fn make_ready(&mut self, id: u64) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.slot = Slot::Ready;
            self.ready
                .entry(job.tube.clone())
                .or_default()
                .insert((job.priority, id));
        }
    }

    /// Move due delayed jobs and expired reservations to ready.
    /// Returns the earliest instant at which another transition is due.
    fn promote(&mut self, now: Instant) -> Option<Instant> {
        let mut due = Vec::new();
        let mut next_event: Option<Instant> = None;

        for (id, job) in &self.jobs {
            let at = match job.slot {
                Slot::Ready => continue,
                Slot::Delayed { until } => until,
                Slot::Reserved { deadline } => deadline,
            };
            if at <= now {
                if matches!(job.slot, Slot::Reserved { .. }) {
                    debug!("Job {} exceeded its time-to-run, back to ready", id);
                }
                due.push(*id);
            } else {
                next_event = Some(next_event.map_or(at, |t| t.min(at)));
            }
        }

        for id in due {
            self.make_ready(id);
        }
        next_event
    }

    fn take_ready(&mut self, tubes: &[String], now: Instant) -> Option<Reservation> {
        let (tube, key) = tubes
            .iter()
            .filter_map(|t| self.ready.get(t).and_then(|set| set.first()).map(|k| (t, *k)))
            .min_by_key(|(_, key)| *key)?;
        let tube = tube.clone();

        if let Some(set) = self.ready.get_mut(&tube) {
            set.remove(&key);
        }
        let job = self.jobs.get_mut(&key.1)?;
        job.slot = Slot::Reserved { deadline: now + job.ttr };

        Some(Reservation {
            id: key.1,
            body: job.body.clone(),
        })
    }

    fn unlink_ready(&mut self, id: u64) {
        if let Some(job) = self.jobs.get(&id) {
            if let Some(set) = self.ready.get_mut(&job.tube) {
                set.remove(&(job.priority, id));
            }
        }
    }
}

/// Process-local tube server shared by any number of connections
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
    notify: Arc<Notify>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to this server
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            server: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    /// Current state of job `id`, or `None` once deleted
    pub fn job_state(&self, id: u64) -> Option<MemoryJobState> {
        let mut state = self.state.lock();
        state.promote(Instant::now());
        state.jobs.get(&id).map(|job| match job.slot {
            Slot::Ready => MemoryJobState::Ready,
            Slot::Delayed { .. } => MemoryJobState::Delayed,
            Slot::Reserved { .. } => MemoryJobState::Reserved,
        })
    }

    /// Priority currently stored for job `id`
    pub fn job_priority(&self, id: u64) -> Option<u32> {
        self.state.lock().jobs.get(&id).map(|job| job.priority)
    }

    /// Number of jobs ready for reservation on `tube`
    pub fn ready_len(&self, tube: &str) -> usize {
        let mut state = self.state.lock();
        state.promote(Instant::now());
        state.ready.get(tube).map_or(0, BTreeSet::len)
    }
}

/// Connection to a [`MemoryServer`]
pub struct MemoryConnection {
    server: MemoryServer,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Connect to a fresh, private server
    pub fn new() -> Self {
        MemoryServer::new().connect()
    }

    pub fn server(&self) -> &MemoryServer {
        &self.server
    }

    fn check_open(&self, op: &'static str) -> Result<(), ConnError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ConnError::new(op, ConnErrorKind::Closed))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn put(
        &self,
        tube: &str,
        body: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ConnError> {
        self.check_open("put")?;
        let now = Instant::now();

        let id = {
            let mut state = self.server.state.lock();
            state.last_id += 1;
            let id = state.last_id;
            let slot = if delay.is_zero() {
                Slot::Ready
            } else {
                Slot::Delayed { until: now + delay }
            };
            state.jobs.insert(
                id,
                StoredJob {
                    tube: tube.to_string(),
                    priority,
                    body: body.to_vec(),
                    ttr: ttr.max(MIN_TTR),
                    slot,
                },
            );
            if delay.is_zero() {
                state.make_ready(id);
            }
            id
        };

        self.server.notify.notify_waiters();
        Ok(id)
    }

    async fn reserve_with_timeout(
        &self,
        tubes: &[String],
        timeout: Duration,
    ) -> Result<Reservation, ConnError> {
        let deadline = Instant::now() + timeout;

        loop {
            self.check_open(OP_RESERVE_WITH_TIMEOUT)?;

            let notified = self.server.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wake_at = {
                let mut state = self.server.state.lock();
                let now = Instant::now();
                let next_event = state.promote(now);
                if let Some(reservation) = state.take_ready(tubes, now) {
                    return Ok(reservation);
                }
                if now >= deadline {
                    return Err(ConnError::reserve_timeout());
                }
                next_event.map_or(deadline, |at| at.min(deadline))
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, id: u64) -> Result<(), ConnError> {
        self.check_open("delete")?;
        let mut state = self.server.state.lock();
        state.unlink_ready(id);
        state
            .jobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ConnError::new("delete", ConnErrorKind::NotFound))
    }

    async fn release(&self, id: u64, priority: u32, delay: Duration) -> Result<(), ConnError> {
        self.check_open("release")?;
        {
            let mut state = self.server.state.lock();
            state.promote(Instant::now());
            let job = state
                .jobs
                .get_mut(&id)
                .filter(|job| matches!(job.slot, Slot::Reserved { .. }))
                .ok_or_else(|| ConnError::new("release", ConnErrorKind::NotFound))?;

            job.priority = priority;
            if delay.is_zero() {
                state.make_ready(id);
            } else {
                job.slot = Slot::Delayed { until: Instant::now() + delay };
            }
        }

        self.server.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnError> {
        self.closed.store(true, Ordering::Release);
        self.server.notify.notify_waiters();
        Ok(())
    }

    fn is_multiplexed(&self) -> bool {
        true
    }
}

/// Dialer handing out connections to one shared [`MemoryServer`]
#[derive(Clone, Default)]
pub struct MemoryDialer {
    server: MemoryServer,
}

impl MemoryDialer {
    pub fn new(server: MemoryServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &MemoryServer {
        &self.server
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self, _addr: &str) -> Result<Arc<dyn Connection>, ConnError> {
        Ok(Arc::new(self.server.connect()))
    }
}
