//! # OVH Sniper Runtime
//!
//! Execution side of the sniper:
//!
//! - [`retry`]: the resilient call wrapper every outbound call goes through
//! - [`workflow`]: the poll → notify → order → notify state machine
//!
//! Everything runs on a single logical thread of control. The workflow
//! awaits each call in turn and never spawns tasks; sleeps go through the
//! [`Sleeper`] trait so tests can record them instead of waiting.

use async_trait::async_trait;
use ovh_sniper_core::Sleeper;
use std::time::Duration;

pub mod retry;
pub mod workflow;

pub use retry::{
    Backoff, ResilientCaller, RetryContext, RetryFailure, RetryPolicy, retry_with_policy,
};
pub use workflow::{
    CartSteps, MIN_POLL_INTERVAL, OnFatalError, OrderTarget, OrderWorkflow, Stage,
    WorkflowConfig, WorkflowError,
};

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_waits() {
        let before = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(2)).await;
        assert!(before.elapsed() >= Duration::from_secs(2));
    }
}
