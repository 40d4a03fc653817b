//! # OVH Sniper
//!
//! Watches the availability of one OVH dedicated server plan in one
//! datacenter, and as soon as it is no longer `unavailable`:
//!
//! 1. tells the operator on Telegram,
//! 2. builds a cart and checks it out,
//! 3. sends the order number, price and confirmation link.
//!
//! The binary is a thin shell over [`run`]: load [`Config`], install
//! tracing, run the workflow, map the outcome to an exit status.

use ovh_sniper_core::{ApiError, Notifier, NotifyError, OrderResult, Sleeper};
use ovh_sniper_ovh::OvhClient;
use ovh_sniper_runtime::{OrderWorkflow, ResilientCaller, TokioSleeper, WorkflowError};
use ovh_sniper_telegram::TelegramNotifier;
use std::sync::Arc;
use thiserror::Error;

pub mod config;

pub use config::{Config, ConfigError};

/// Reasons the sniper stops without an order.
#[derive(Debug, Error)]
pub enum SniperError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OVH client could not be built
    #[error("OVH client setup failed: {0}")]
    Ovh(#[from] ApiError),

    /// The Telegram client could not be built
    #[error("Telegram client setup failed: {0}")]
    Telegram(#[from] NotifyError),

    /// The workflow hit an unrecoverable error
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Wire the clients, the retry wrapper and the workflow together.
///
/// # Errors
///
/// Returns [`SniperError`] if an HTTP client cannot be built.
pub fn build_workflow(
    config: &Config,
    sleeper: Arc<dyn Sleeper>,
) -> Result<OrderWorkflow, SniperError> {
    let shop = OvhClient::new(
        config.ovh.endpoint.clone(),
        config.ovh.credentials.clone(),
        config.http_timeout,
    )?;
    tracing::debug!(endpoint = %shop.endpoint(), "OVH client ready");

    let telegram = TelegramNotifier::new(
        &config.telegram.api_url,
        &config.telegram.bot_token,
        &config.telegram.chat_id,
        config.http_timeout,
    )?;
    tracing::debug!(chat_id = telegram.chat_id(), "Telegram notifier ready");
    let notifier: Arc<dyn Notifier> = Arc::new(telegram);

    let mut caller = ResilientCaller::new(config.retry_policy(), Arc::clone(&sleeper));
    if config.notify_call_failures {
        caller = caller.with_alerts(Arc::clone(&notifier));
    }
    tracing::debug!(
        max_attempts = caller.policy().max_attempts,
        alerts = config.notify_call_failures,
        "Retry wrapper ready"
    );

    Ok(OrderWorkflow::new(
        config.workflow_config(),
        Arc::new(shop),
        notifier,
        sleeper,
        caller,
    ))
}

/// Run the sniper until an order is confirmed.
///
/// # Errors
///
/// Returns [`SniperError`] if setup fails or the workflow aborts.
pub async fn run(config: &Config) -> Result<OrderResult, SniperError> {
    let workflow = build_workflow(config, Arc::new(TokioSleeper))?;

    let settings = workflow.config();
    tracing::info!(
        plan_code = %settings.target.plan_code,
        datacenter = %settings.target.datacenter,
        label = %settings.target.label,
        endpoint = %config.ovh.endpoint,
        "Starting OVH sniper"
    );

    Ok(workflow.run().await?)
}

/// Load the configuration from the environment, then [`run`].
///
/// # Errors
///
/// Returns [`SniperError::Config`] before any call is made if the
/// configuration is incomplete, otherwise whatever [`run`] returns.
pub async fn run_from_env() -> Result<OrderResult, SniperError> {
    let config = Config::from_env()?;
    run(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_keeps_its_message() {
        let err = SniperError::from(ConfigError::Missing("BOT_TOKEN"));

        assert!(matches!(err, SniperError::Config(ConfigError::Missing("BOT_TOKEN"))));
        assert_eq!(
            err.to_string(),
            "Missing required environment variable BOT_TOKEN"
        );
    }
}
