//! Polling for asynchronous remote state transitions

use std::future::Future;
use std::time::Duration;
use tfplug::Context;
use tokio::time::Instant;

use crate::api::ApiError;

/// Status the waiter reports for an object that no longer exists. Fetch
/// functions used while deleting map NotFound to this.
pub const DELETED: &str = "deleted";

#[derive(Debug, Clone)]
pub struct WaitSpec {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub failure: Vec<String>,
    pub interval: Duration,
    pub delay: Duration,
    pub timeout: Duration,
    /// Consecutive transient fetch failures tolerated
    pub max_retries: u32,
}

impl WaitSpec {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            failure: Vec::new(),
            interval: Duration::from_secs(3),
            delay: Duration::from_secs(1),
            timeout,
            max_retries: 0,
        }
    }

    pub fn failure(mut self, failure: &[&str]) -> Self {
        self.failure = failure.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

async fn pause(ctx: &Context, duration: Duration) -> Result<(), ApiError> {
    if duration.is_zero() {
        return Ok(());
    }
    ctx.run(tokio::time::sleep(duration)).await?;
    Ok(())
}

/// Poll `fetch` until it reports a target status.
///
/// `fetch` yields the current object with its status. A failure status, or
/// a status outside `pending` when `pending` is non-empty, ends the wait with
/// `UnexpectedStatus`.
pub async fn wait_for<T, F, Fut>(ctx: &Context, spec: &WaitSpec, mut fetch: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(T, String), ApiError>>,
{
    let deadline = Instant::now() + spec.timeout;
    let mut transient_failures = 0;

    pause(ctx, spec.delay).await?;

    loop {
        match ctx.run(fetch()).await? {
            Ok((value, status)) => {
                transient_failures = 0;
                tracing::debug!("Waiting for {:?}, current status {:?}", spec.target, status);

                if spec.target.contains(&status) {
                    return Ok(value);
                }
                if spec.failure.contains(&status)
                    || (!spec.pending.is_empty() && !spec.pending.contains(&status))
                {
                    return Err(ApiError::UnexpectedStatus {
                        status,
                        target: spec.target.clone(),
                    });
                }
            }
            Err(e) if e.is_retryable() && transient_failures < spec.max_retries => {
                transient_failures += 1;
                tracing::warn!(
                    "Transient error while waiting (attempt {} of {}): {}",
                    transient_failures,
                    spec.max_retries,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ApiError::Timeout(spec.timeout));
        }
        // Shorten the last sleep so one final poll lands inside the timeout.
        pause(ctx, spec.interval.min(deadline - now)).await?;
    }
}
