//! Reconnection backoff.
//!
//! The interval is squared after every failure (2s, 4s, 16s, 256s, ...) and
//! restored to its initial value once a session is established. There is no
//! upper bound and no retry limit.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Initial reconnect interval in seconds.
pub const INITIAL_INTERVAL_SECS: u64 = 2;

/// Tracks the reconnect interval for the chat transport.
#[derive(Debug, Clone)]
pub struct BackoffConnector {
    initial: u64,
    interval: u64,
}

impl BackoffConnector {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            initial: initial_secs,
            interval: initial_secs,
        }
    }

    /// Current interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Square the interval after a failed attempt or a lost connection and
    /// return the new delay to wait before trying again.
    pub fn record_failure(&mut self) -> Duration {
        self.interval = self.interval.saturating_mul(self.interval);
        self.interval()
    }

    /// Reset state after a successful connection.
    pub fn reset(&mut self) {
        self.interval = self.initial;
    }

    /// Call `connect` until it succeeds, waiting the squared interval
    /// between attempts.
    pub async fn attempt<F, Fut, T, E>(&mut self, mut connect: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        loop {
            match connect().await {
                Ok(conn) => return conn,
                Err(e) => {
                    let delay = self.record_failure();
                    warn!("Could not connect: ({}), retrying in {} seconds.", e, delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for BackoffConnector {
    fn default() -> Self {
        Self::new(INITIAL_INTERVAL_SECS)
    }
}
