//! Per-call operation context: cancellation, deadline and pinned clock

use crate::error::{Error, Result};
use crate::version::VersionTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Context passed to every store operation
///
/// Clones share the cancellation flag, so cancelling any clone cancels all of
/// them. Deadline and pinned time are per clone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    pinned_time: Option<VersionTime>,
}

impl Context {
    /// A context that is never cancelled and uses the wall clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort once `deadline` has passed
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Make [`VersionTime::now`] return `time` for this context
    pub fn with_pinned_time(&self, time: VersionTime) -> Self {
        Self {
            pinned_time: Some(time),
            ..self.clone()
        }
    }

    pub fn pinned_time(&self) -> Option<VersionTime> {
        self.pinned_time
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancelled explicitly or past the deadline
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Returns `Err(Error::Cancelled)` if the operation must stop
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
