use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::transport::{ConnError, Connection, Reservation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Put {
        tube: String,
        body: Vec<u8>,
        priority: u32,
        delay: Duration,
        ttr: Duration,
    },
    Reserve {
        tubes: Vec<String>,
        timeout: Duration,
    },
    Delete(u64),
    Release {
        id: u64,
        priority: u32,
        delay: Duration,
    },
    Close,
}

/// Connection that records every call and replays scripted results.
///
/// Reservations pop from the script; once it runs dry they wait out the slice
/// and report a timeout, like an idle tube. A zero slice answers at once.
#[derive(Default)]
pub(crate) struct ScriptedConnection {
    calls: Mutex<Vec<Call>>,
    put_ids: Mutex<VecDeque<u64>>,
    put_error: Mutex<Option<ConnError>>,
    reserves: Mutex<VecDeque<Result<Reservation, ConnError>>>,
}

impl ScriptedConnection {
    pub(crate) fn with_put_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let conn = Self::default();
        conn.put_ids.lock().extend(ids);
        conn
    }

    pub(crate) fn fail_puts(&self, err: ConnError) {
        *self.put_error.lock() = Some(err);
    }

    pub(crate) fn script_timeouts(&self, n: usize) {
        let mut reserves = self.reserves.lock();
        for _ in 0..n {
            reserves.push_back(Err(ConnError::reserve_timeout()));
        }
    }

    pub(crate) fn script_reservation(&self, id: u64, body: &[u8]) {
        self.reserves.lock().push_back(Ok(Reservation {
            id,
            body: body.to_vec(),
        }));
    }

    pub(crate) fn script_error(&self, err: ConnError) {
        self.reserves.lock().push_back(Err(err));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn reserve_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Reserve { .. }))
            .count()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn put(
        &self,
        tube: &str,
        body: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ConnError> {
        self.calls.lock().push(Call::Put {
            tube: tube.to_string(),
            body: body.to_vec(),
            priority,
            delay,
            ttr,
        });
        if let Some(err) = self.put_error.lock().clone() {
            return Err(err);
        }
        Ok(self.put_ids.lock().pop_front().unwrap_or(1))
    }

    async fn reserve_with_timeout(
        &self,
        tubes: &[String],
        timeout: Duration,
    ) -> Result<Reservation, ConnError> {
        self.calls.lock().push(Call::Reserve {
            tubes: tubes.to_vec(),
            timeout,
        });
        let scripted = self.reserves.lock().pop_front();
        match scripted {
            Some(result) => result,
            None => {
                if !timeout.is_zero() {
                    tokio::time::sleep(timeout).await;
                }
                Err(ConnError::reserve_timeout())
            }
        }
    }

    async fn delete(&self, id: u64) -> Result<(), ConnError> {
        self.calls.lock().push(Call::Delete(id));
        Ok(())
    }

    async fn release(&self, id: u64, priority: u32, delay: Duration) -> Result<(), ConnError> {
        self.calls.lock().push(Call::Release { id, priority, delay });
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnError> {
        self.calls.lock().push(Call::Close);
        Ok(())
    }
}
