//! Retry logic with capped backoff for handling transient failures.
//!
//! Every outbound call of the workflow goes through [`ResilientCaller`]. It
//! retries transport failures, rate limiting and upstream hiccups with a
//! bounded delay, gives up after `max_attempts` calls, and hands the
//! workflow an `Option` instead of an error: `None` is the "no result"
//! sentinel the workflow branches on.
//!
//! # Example
//!
//! ```rust
//! use ovh_sniper_runtime::retry::{ResilientCaller, RetryPolicy};
//! use ovh_sniper_runtime::TokioSleeper;
//! use ovh_sniper_core::ApiError;
//! use std::sync::{Arc, Mutex, PoisonError};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .linear(Duration::from_secs(2), Duration::from_secs(10))
//!     .build();
//! let caller = ResilientCaller::new(policy, Arc::new(TokioSleeper));
//!
//! let result = caller
//!     .call("get_answer", || async { Ok::<_, ApiError>(42) })
//!     .await;
//! assert_eq!(result, Some(42));
//! # }
//! ```

use ovh_sniper_core::{Notifier, Retryable, Sleeper};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed {
        /// Delay between attempts
        delay: Duration,
    },
    /// `min(step × attempt, max_delay)`.
    Linear {
        /// Increment per failed attempt
        step: Duration,
        /// Ceiling
        max_delay: Duration,
    },
}

impl Backoff {
    /// Delay after the `attempt`-th failure (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, max_delay } => {
                step.saturating_mul(attempt.max(1)).min(max_delay)
            }
        }
    }
}

/// Retry policy configuration.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `backoff`: linear, 2 seconds per attempt, capped at 10 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of calls, the first one included
    pub max_attempts: u32,
    /// Delay schedule
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_attempts: None,
            backoff: None,
        }
    }

    /// Delay after the `attempt`-th failure.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    backoff: Option<Backoff>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of attempts (at least one call is always made).
    #[must_use]
    pub const fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Use a fixed delay between attempts.
    #[must_use]
    pub const fn fixed(mut self, delay: Duration) -> Self {
        self.backoff = Some(Backoff::Fixed { delay });
        self
    }

    /// Use a linear delay capped at `max_delay`.
    #[must_use]
    pub const fn linear(mut self, step: Duration, max_delay: Duration) -> Self {
        self.backoff = Some(Backoff::Linear { step, max_delay });
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(5).max(1),
            backoff: self.backoff.unwrap_or(Backoff::Linear {
                step: Duration::from_secs(2),
                max_delay: Duration::from_secs(10),
            }),
        }
    }
}

/// State of one wrapped call when it gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext<E> {
    /// Number of failed calls
    pub attempt: u32,
    /// Budget the call ran with
    pub max_attempts: u32,
    /// Error of the last call
    pub last_error: E,
}

/// Why a wrapped call produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// Every attempt failed with a retryable error.
    Exhausted(RetryContext<E>),
    /// A non-retryable error ended the call early.
    Fatal(RetryContext<E>),
}

impl<E> RetryFailure<E> {
    /// Context of the failed call.
    #[must_use]
    pub const fn context(&self) -> &RetryContext<E> {
        match self {
            Self::Exhausted(context) | Self::Fatal(context) => context,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(context) => write!(
                f,
                "max retries reached ({}/{}): {}",
                context.attempt, context.max_attempts, context.last_error
            ),
            Self::Fatal(context) => write!(f, "non-retryable error: {}", context.last_error),
        }
    }
}

/// Retry an async operation while its errors are retryable.
///
/// # Arguments
///
/// * `policy` - Retry policy configuration
/// * `sleeper` - Where the backoff delays are spent
/// * `name` - Operation name for diagnostics
/// * `operation` - Async operation to retry (must be `FnMut` to allow multiple calls)
///
/// # Errors
///
/// Returns [`RetryFailure::Fatal`] on the first non-retryable error and
/// [`RetryFailure::Exhausted`] once `max_attempts` calls have failed.
/// No delay follows the last failed call.
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    name: &str,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(operation = name, attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => {
                tracing::error!(
                    operation = name,
                    error = %err,
                    "Unexpected error, not retrying"
                );
                return Err(RetryFailure::Fatal(RetryContext {
                    attempt: attempt + 1,
                    max_attempts,
                    last_error: err,
                }));
            }
            Err(err) => {
                attempt += 1;

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Max retries reached, request failed"
                    );
                    return Err(RetryFailure::Exhausted(RetryContext {
                        attempt,
                        max_attempts,
                        last_error: err,
                    }));
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation = name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Request failed, retrying..."
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}

/// Runs outbound calls under a [`RetryPolicy`] and absorbs their errors.
///
/// When an alert channel is attached, a call that ends without a result
/// pushes one message to the operator. The same message for the same
/// operation is not repeated until that operation has succeeded again.
#[derive(Clone)]
pub struct ResilientCaller {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    alerts: Option<Arc<dyn Notifier>>,
    /// Last alert sent per operation that has not succeeded since
    alerted: Arc<Mutex<HashMap<String, String>>>,
}

impl ResilientCaller {
    /// Create a caller without operator alerts.
    #[must_use]
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            sleeper,
            alerts: None,
            alerted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Alert the operator through `notifier` when a call gives up.
    #[must_use]
    pub fn with_alerts(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.alerts = Some(notifier);
        self
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, returning `None` if it never succeeded.
    pub async fn call<F, Fut, T, E>(&self, name: &str, operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        match retry_with_policy(&self.policy, self.sleeper.as_ref(), name, operation).await {
            Ok(result) => {
                self.clear_alert(name);
                Some(result)
            }
            Err(failure) => {
                self.alert(name, &failure).await;
                None
            }
        }
    }

    async fn alert<E: fmt::Display>(&self, name: &str, failure: &RetryFailure<E>) {
        let Some(notifier) = &self.alerts else {
            return;
        };

        let text = match failure {
            RetryFailure::Exhausted(context) => {
                format!("Max retries reached for {name}: {}", context.last_error)
            }
            RetryFailure::Fatal(context) => {
                format!("Unexpected error in {name}: {}", context.last_error)
            }
        };

        {
            let mut alerted = self.alerted.lock().unwrap_or_else(PoisonError::into_inner);
            if alerted.get(name) == Some(&text) {
                tracing::debug!(operation = name, "Failure alert already sent, skipping");
                return;
            }
            alerted.insert(name.to_string(), text.clone());
        }

        match notifier.send_message(&text).await {
            Ok(delivery) if delivery.is_delivered() => {
                tracing::debug!(operation = name, "Failure alert sent");
            }
            Ok(delivery) => {
                tracing::warn!(operation = name, status = delivery.status, "Failure alert rejected");
            }
            Err(err) => {
                tracing::warn!(operation = name, error = %err, "Failure alert could not be sent");
            }
        }
    }

    fn clear_alert(&self, name: &str) {
        self.alerted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

impl fmt::Debug for ResilientCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCaller")
            .field("policy", &self.policy)
            .field("alerts", &self.alerts.is_some())
            .finish_non_exhaustive()
    }
}
