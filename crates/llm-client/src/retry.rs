//! Bounded retry for rate-limited provider calls.
//!
//! Providers answer HTTP 429 with a body such as `Please try again in 9.24s`. The client turns
//! that into [`LlmError::RateLimited`] with the suggested wait plus a small buffer; [`with_retry`]
//! sleeps that long and tries again, up to [`RetryPolicy::max_attempts`] calls in total.
//! Transient failures (5xx, network timeouts) are retried after [`RetryPolicy::default_wait`].
//! Every other error is returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::LlmError;

const RETRY_MARKER: &str = "try again in ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls, including the first.
    pub max_attempts: u32,
    /// Wait used when the response carries no hint.
    pub default_wait: Duration,
    /// Added to a parsed hint.
    pub buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_wait: Duration::from_secs(5),
            buffer: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wait for a rate-limited response whose body yielded `hint`.
    pub fn wait_for(&self, hint: Option<Duration>) -> Duration {
        match hint {
            Some(d) => d + self.buffer,
            None => self.default_wait,
        }
    }
}

/// Parses the wait hint out of a rate-limit message.
///
/// Accepts `9.24s`, `250ms`, `1m30.5s`. Returns `None` when there is no positive hint.
pub fn parse_retry_after(body: &str) -> Option<Duration> {
    let start = body.find(RETRY_MARKER)? + RETRY_MARKER.len();
    let mut rest = &body[start..];
    let mut seconds = 0f64;
    let mut matched = false;

    loop {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            break;
        }
        let value: f64 = match rest[..num_len].parse() {
            Ok(v) => v,
            Err(_) => break,
        };
        rest = &rest[num_len..];

        if let Some(r) = rest.strip_prefix("ms") {
            seconds += value / 1000.0;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('s') {
            seconds += value;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('m') {
            seconds += value * 60.0;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('h') {
            seconds += value * 3600.0;
            rest = r;
        } else {
            break;
        }
        matched = true;
    }

    (matched && seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Runs `op` until it returns something other than a rate limit or transient failure, or
/// attempts run out.
///
/// The sleep between attempts is an ordinary `tokio::time::sleep`; dropping the returned
/// future cancels it.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_rate_limit() || err.is_transient() => {
                if attempt >= attempts {
                    return Err(LlmError::RetriesExhausted {
                        attempts,
                        last: Box::new(err),
                    });
                }
                let wait = err.retry_after().unwrap_or(policy.default_wait);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "provider call failed, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}
