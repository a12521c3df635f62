//! Per-operation context carrying cancellation and deadlines
//!
//! The host hands every provider callback a `Context`. Long-running work
//! (HTTP calls, status polling) races against `Context::cancelled` so that
//! an interrupted apply stops promptly. Cancelling never rolls back remote
//! side effects that already happened.

use crate::error::{Result, TfplugError};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries the cancellation signal and optional deadline of one
/// host operation. Clones share the same cancellation signal.
#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    done: Arc<watch::Sender<bool>>,
}

impl Context {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            deadline: None,
            done: Arc::new(done),
        }
    }

    /// Derive a context that is additionally cancelled after `timeout`.
    /// An earlier deadline on `self` wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };

        Self {
            deadline: Some(deadline),
            done: Arc::clone(&self.done),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.done.borrow() {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    pub fn cancel(&self) {
        self.done.send_replace(true);
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        let mut rx = self.done.subscribe();
        let signalled = async move {
            // The sender lives as long as `self`, so this only returns on `true`.
            let _ = rx.wait_for(|done| *done).await;
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signalled => {}
                    _ = time::sleep_until(deadline.into()) => {}
                }
            }
            None => signalled.await,
        }
    }

    /// Drive `fut` to completion unless the context is cancelled first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(TfplugError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => {
                tracing::debug!("Operation cancelled, deadline {:?}", self.deadline);
                Err(TfplugError::Cancelled)
            }
            output = fut => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
