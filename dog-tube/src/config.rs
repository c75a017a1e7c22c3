use std::time::Duration;
use tracing::warn;

/// Shortest reservation slice; a zero slice would never block on the server
pub const MIN_POLL_SLICE: Duration = Duration::from_millis(1);

/// Configuration for the tube adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeConfig {
    /// Extra dial attempts after the first one fails
    pub dial_retries: u32,
    /// Pause between dial attempts
    pub dial_delay: Duration,
    /// How long a single reservation may block; bounds cancellation latency
    pub poll_slice: Duration,
    /// Time a consumer has between reservation and ack before the job is requeued
    pub time_to_run: Duration,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self {
            dial_retries: 10,
            dial_delay: Duration::from_secs(10),
            poll_slice: Duration::from_secs(1),
            time_to_run: Duration::from_secs(60),
        }
    }
}

impl TubeConfig {
    pub fn with_dial_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.dial_retries = retries;
        self.dial_delay = delay;
        self
    }

    /// Slices shorter than [`MIN_POLL_SLICE`] are raised to it
    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice.max(MIN_POLL_SLICE);
        self
    }

    pub fn with_time_to_run(mut self, ttr: Duration) -> Self {
        self.time_to_run = ttr;
        self
    }

    /// Overlay defaults with `{prefix}_DIAL_RETRIES`, `{prefix}_DIAL_DELAY_MS`,
    /// `{prefix}_POLL_SLICE_MS` and `{prefix}_TTR_SECS` from the environment
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit set of variables
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        let prefix = format!("{}_", prefix.trim_end_matches('_'));

        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(&prefix) else {
                continue;
            };
            let value = value.as_ref();
            let Ok(n) = value.trim().parse::<u64>() else {
                warn!("Ignoring {}{}={:?}: not an unsigned integer", prefix, name, value);
                continue;
            };

            match name {
                "DIAL_RETRIES" => config.dial_retries = u32::try_from(n).unwrap_or(u32::MAX),
                "DIAL_DELAY_MS" => config.dial_delay = Duration::from_millis(n),
                "POLL_SLICE_MS" => config = config.with_poll_slice(Duration::from_millis(n)),
                "TTR_SECS" => config.time_to_run = Duration::from_secs(n),
                _ => {}
            }
        }

        config
    }
}
