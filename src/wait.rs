//! Polling with a deadline, and rich timeout errors
//!
//! Waits poll a check at a fixed interval until it reports nothing pending
//! or the deadline passes. The deadline is measured from the start of the
//! wait and is hard: the final sleep is shortened to fit, and a check still
//! running when the deadline arrives is dropped.
//!
//! # Example
//!
//! ```ignore
//! match ctx.wait_until_ready(Some(Duration::from_secs(60)), Duration::from_secs(1)).await {
//!     Err(Error::Timeout(err)) => {
//!         println!("Gave up after {:?}", err.elapsed);
//!         for pending in &err.pending {
//!             println!("  {} - {}", pending.resource, pending.state);
//!         }
//!     }
//!     _ => {}
//! }
//! ```

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// A resource that was still pending when a wait gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResource {
    /// Resource reference (e.g., "deployment/myapp")
    pub resource: String,
    /// Last observed state (e.g., "1/3 ready")
    pub state: String,
}

impl PendingResource {
    pub fn new(resource: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            state: state.into(),
        }
    }
}

/// Rich error context for a wait that timed out
#[derive(Debug, Clone)]
pub struct WaitError {
    /// What was being waited on (e.g., "deployment/myapp" or "3 resources")
    pub resource: String,
    /// Description of the last observed state
    pub last_state: String,
    /// How long we waited before giving up
    pub elapsed: Duration,
    /// The timeout that was configured
    pub timeout: Duration,
    /// Resources that were still pending at the deadline
    pub pending: Vec<PendingResource>,
}

impl WaitError {
    pub fn new(resource: impl Into<String>, timeout: Duration, elapsed: Duration) -> Self {
        Self {
            resource: resource.into(),
            last_state: "unknown".to_string(),
            elapsed,
            timeout,
            pending: Vec::new(),
        }
    }

    /// Set the last observed state
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.last_state = state.into();
        self
    }

    /// Attach the resources still pending
    pub fn with_pending(mut self, pending: Vec<PendingResource>) -> Self {
        self.pending = pending;
        self
    }
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Wait timeout for {}", self.resource)?;
        writeln!(f, "├─ Last state: {}", self.last_state)?;
        writeln!(f, "├─ Elapsed: {:?}", self.elapsed)?;
        writeln!(f, "└─ Timeout: {:?}", self.timeout)?;

        if !self.pending.is_empty() {
            writeln!(f)?;
            writeln!(f, "Still pending:")?;
            for (i, pending) in self.pending.iter().enumerate() {
                let prefix = if i == self.pending.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                writeln!(f, "{} {}: {}", prefix, pending.resource, pending.state)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for WaitError {}

/// Start time plus an optional timeout
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    timeout: Option<Duration>,
}

impl Deadline {
    /// Start the clock now; `None` never expires
    pub fn start(timeout: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left, or `None` when there is no timeout
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout.map(|t| t.saturating_sub(self.elapsed()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// How long to sleep before the next poll: `min(interval, remaining)`,
    /// or `None` once the deadline has passed
    pub fn next_sleep(&self, interval: Duration) -> Option<Duration> {
        match self.remaining() {
            None => Some(interval),
            Some(r) if r.is_zero() => None,
            Some(r) => Some(interval.min(r)),
        }
    }
}

/// Poll `check` until it returns an empty pending list
///
/// `check` gets exclusive access to `state` on every attempt. Each attempt
/// is cut off at the deadline, so a stalled check cannot stretch the wait.
/// `check` errors end the wait immediately. When the deadline passes, the
/// last pending list is returned inside [`WaitError`].
pub async fn poll_until<S, F>(
    what: &str,
    timeout: Option<Duration>,
    interval: Duration,
    state: &mut S,
    mut check: F,
) -> Result<()>
where
    F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<Vec<PendingResource>>>,
{
    let deadline = Deadline::start(timeout);
    let mut attempts = 0u32;
    let mut last_pending = Vec::new();

    loop {
        attempts += 1;
        let outcome = match deadline.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, check(&mut *state)).await.ok(),
            None => Some(check(&mut *state).await),
        };
        let Some(outcome) = outcome else {
            debug!(what, attempts, "Check still running at the deadline");
            return Err(timed_out(what, timeout, &deadline, last_pending));
        };

        let pending = outcome?;
        if pending.is_empty() {
            debug!(what, attempts, elapsed = ?deadline.elapsed(), "Wait satisfied");
            return Ok(());
        }

        debug!(what, attempts, pending = pending.len(), "Still waiting");

        match deadline.next_sleep(interval) {
            Some(pause) => sleep(pause).await,
            None => return Err(timed_out(what, timeout, &deadline, pending)),
        }
        last_pending = pending;
    }
}

fn timed_out(
    what: &str,
    timeout: Option<Duration>,
    deadline: &Deadline,
    pending: Vec<PendingResource>,
) -> Error {
    let last_state = pending
        .first()
        .map(|p| p.state.clone())
        .unwrap_or_else(|| "no answer before the deadline".to_string());
    WaitError::new(what, timeout.unwrap_or_default(), deadline.elapsed())
        .with_state(last_state)
        .with_pending(pending)
        .into()
}
