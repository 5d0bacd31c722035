//! Host reachability probe using the system `ping` binary.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::common::error::PingError;

/// Result of a completed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// The host answered.
    Reachable,
    /// No answer (ping exit status 1 or 2).
    Unreachable,
    /// Any other exit status; -1 if ping was killed by a signal.
    Status(i32),
}

impl PingOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => PingOutcome::Reachable,
            Some(1) | Some(2) => PingOutcome::Unreachable,
            Some(code) => PingOutcome::Status(code),
            None => PingOutcome::Status(-1),
        }
    }
}

/// Checks whether a host is reachable.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn probe(&self, host: &str) -> Result<PingOutcome, PingError>;
}

/// Runs `ping -W 1 -c 1 <host>` as a child process.
#[derive(Debug, Clone)]
pub struct SystemPinger {
    timeout: Duration,
}

impl SystemPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Pinger for SystemPinger {
    async fn probe(&self, host: &str) -> Result<PingOutcome, PingError> {
        validate_host(host)?;

        debug!("Pinging {}", host);
        let status = Command::new("ping")
            .args(["-W", "1", "-c", "1"])
            .arg(host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let status = tokio::time::timeout(self.timeout, status)
            .await
            .map_err(|_| PingError::Timeout(self.timeout))?
            .inspect_err(|e| info!("Execution failed: {}", e))?;

        Ok(PingOutcome::from_exit_code(status.code()))
    }
}

/// Reject anything `ping` would read as an option instead of a host.
fn validate_host(host: &str) -> Result<(), PingError> {
    let valid = !host.is_empty()
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'));

    if valid {
        Ok(())
    } else {
        Err(PingError::InvalidHost(host.to_string()))
    }
}
