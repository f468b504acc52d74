//! Poll-until-state and retry helpers
//!
//! [`StateChangeConf`] polls a refresh function until the remote object
//! reaches one of the target states. [`retry_when`] repeats an operation while
//! its error is classified as retryable. Both back off exponentially and stop
//! as soon as the request [`Context`] is cancelled.

use crate::context::Context;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?}){}", last_error_suffix(.last_error))]
    Timeout {
        last_state: String,
        target: String,
        timeout: Duration,
        last_error: Option<String>,
    },

    #[error("unexpected state '{state}', wanted target '{target}'{}", last_error_suffix(.last_error))]
    UnexpectedState {
        state: String,
        target: String,
        last_error: Option<String>,
    },

    #[error("couldn't find resource ({retries} retries)")]
    NotFound { retries: u32 },

    #[error("{0}")]
    Refresh(#[source] BoxError),

    #[error("context cancelled while waiting for state to become '{target}'")]
    Cancelled { target: String },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(". last error: {}", e),
        None => String::new(),
    }
}

impl WaitError {
    /// The remote object disappeared while a target state was expected
    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound { .. })
    }
}

/// Exponential back-off between polls: starts at `initial`, doubles, capped at `max`
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Refresh result: `None` when the object does not exist, otherwise the
/// object plus its current state name.
pub type RefreshResult<T> = Result<Option<(T, String)>, BoxError>;

/// Waits for a remote object to move from pending states into a target state.
///
/// An empty `target` means "wait until the object is gone": a refresh that
/// reports not-found then completes the wait with `Ok(None)`.
pub struct StateChangeConf<T> {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Fixed interval between refreshes, overrides the back-off
    pub poll_interval: Option<Duration>,
    pub backoff: Backoff,
    /// Consecutive not-found refreshes tolerated while a target is expected
    pub not_found_checks: u32,
    /// Consecutive target observations required before the wait succeeds
    pub continuous_target_occurrence: u32,
    /// Extracts a failure reason from the last observed object for errors
    pub last_error: Option<fn(&T) -> Option<String>>,
}

impl<T> StateChangeConf<T> {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            poll_interval: None,
            backoff: Backoff::default(),
            not_found_checks: 20,
            continuous_target_occurrence: 1,
            last_error: None,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    pub fn last_error(mut self, extract: fn(&T) -> Option<String>) -> Self {
        self.last_error = Some(extract);
        self
    }

    fn target_display(&self) -> String {
        self.target.join(", ")
    }

    /// Poll `refresh` until a target state, an error, the timeout or cancellation
    pub async fn wait<F, Fut>(&self, ctx: &Context, mut refresh: F) -> Result<Option<T>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RefreshResult<T>>,
    {
        let mut last_state = String::new();
        let mut last_error: Option<String> = None;

        let poll = async {
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }

            let mut interval = self.backoff.initial;
            let mut not_found_ticks = 0;
            let mut target_occurrence = 0;

            loop {
                let observed = match refresh().await {
                    Ok(observed) => observed,
                    Err(e) => return Err(WaitError::Refresh(e)),
                };
                match observed {
                    None => {
                        if self.target.is_empty() {
                            return Ok(None);
                        }
                        not_found_ticks += 1;
                        if not_found_ticks > self.not_found_checks {
                            return Err(WaitError::NotFound {
                                retries: not_found_ticks,
                            });
                        }
                        last_state.clear();
                    }
                    Some((object, state)) => {
                        not_found_ticks = 0;
                        if let Some(extract) = self.last_error {
                            last_error = extract(&object);
                        }
                        last_state = state;

                        if self.target.contains(&last_state) {
                            target_occurrence += 1;
                            if target_occurrence >= self.continuous_target_occurrence {
                                return Ok(Some(object));
                            }
                        } else if self.pending.contains(&last_state) {
                            target_occurrence = 0;
                        } else {
                            return Err(WaitError::UnexpectedState {
                                state: last_state.clone(),
                                target: self.target_display(),
                                last_error: last_error.clone(),
                            });
                        }
                    }
                }

                let wait = self.poll_interval.unwrap_or(interval);
                tracing::trace!(state = %last_state, ?wait, "waiting for state change");
                time::sleep(wait).await;
                interval = self.backoff.next(interval);
            }
        };

        let outcome = tokio::select! {
            result = time::timeout(self.timeout, poll) => Some(result),
            _ = ctx.cancelled() => None,
        };

        match outcome {
            Some(Ok(result)) => result,
            Some(Err(_elapsed)) => Err(WaitError::Timeout {
                last_state,
                target: self.target_display(),
                timeout: self.timeout,
                last_error,
            }),
            None => Err(WaitError::Cancelled {
                target: self.target_display(),
            }),
        }
    }
}

/// Run `op` until it succeeds, fails with an error `retryable` rejects, or
/// `timeout` elapses. The last error is returned when giving up.
pub async fn retry_when<T, E, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    mut op: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let deadline = Instant::now() + timeout;
    let backoff = Backoff::default();
    let mut interval = backoff.initial;
    let mut attempt = 0u32;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempt += 1;

        let now = Instant::now();
        if !retryable(&err) || now >= deadline || ctx.is_cancelled() {
            return Err(err);
        }

        let wait = interval.min(deadline - now);
        tracing::debug!(attempt, ?wait, "retrying after retryable error");
        tokio::select! {
            _ = time::sleep(wait) => {}
            _ = ctx.cancelled() => return Err(err),
        }
        interval = backoff.next(interval);
    }
}
