//! Order workflow.
//!
//! ```text
//!   ┌──────► POLL ──── unavailable ──► sleep ──┐
//!   │          │                              │
//!   │          ▼ anything else                │
//!   │   NOTIFY_AVAILABLE ── not delivered ────┤
//!   │          │                              │
//!   │          ▼                              │
//!   │     BUILD_ORDER ───── no result ────────┤
//!   │          │                              │
//!   │          ▼                              │
//!   │     NOTIFY_ORDER ──── not delivered ────┤
//!   │          │                              │
//!   │          ▼                              │
//!   │        DONE                             │
//!   └─────────────────────────────────────────┘
//! ```
//!
//! Remote failures never cross into this module as errors: the
//! [`ResilientCaller`] turns them into `None` and the cycle goes back to
//! POLL. [`WorkflowError`] is reserved for answers the workflow cannot
//! interpret; what happens then is decided by [`OnFatalError`].

use crate::retry::ResilientCaller;
use ovh_sniper_core::{
    Account, AvailabilityObservation, Cart, CheckoutRequest, ConfigurationRequest,
    CreateCartRequest, EcoItemRequest, EcoOptionRequest, Notifier, OrderResult, ShopApi, Sleeper,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Floor for every sleep between poll cycles.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Errors that escape a poll cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A call succeeded but its answer lacks what the workflow needs.
    #[error("Malformed {step} response: {detail}")]
    MalformedResponse {
        /// Operation that produced the answer
        step: &'static str,
        /// What was wrong with it
        detail: String,
    },
}

/// What to do when a cycle ends with a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFatalError {
    /// Notify the operator and stop.
    Abort,
    /// Notify the operator, wait `cooldown`, poll again.
    Continue {
        /// Pause before the next cycle
        cooldown: Duration,
    },
}

/// Handling of the intermediate cart steps (assignment, options,
/// configuration labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSteps {
    /// A failed step abandons the order attempt.
    Checked,
    /// A failed step is logged and the order proceeds to checkout.
    BestEffort,
}

/// The server to watch and how to order it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTarget {
    /// Catalog plan code
    pub plan_code: String,
    /// Datacenter code
    pub datacenter: String,
    /// Name used in operator messages
    pub label: String,
    /// Option plan codes attached to the item (RAM, RAID)
    pub option_plan_codes: Vec<String>,
    /// Operating system configuration value
    pub os: String,
    /// Commitment duration
    pub duration: String,
    /// Pricing mode
    pub pricing_mode: String,
    /// Number of servers
    pub quantity: u32,
    /// Pay automatically at checkout
    pub auto_pay: bool,
}

impl Default for OrderTarget {
    fn default() -> Self {
        Self {
            plan_code: "24ska01".to_string(),
            datacenter: "bhs".to_string(),
            label: "KSA".to_string(),
            option_plan_codes: vec![
                "ram-64g-noecc-2133-24ska01".to_string(),
                "softraid-1x480ssd-24ska01".to_string(),
            ],
            os: "none_64.en".to_string(),
            duration: "P1M".to_string(),
            pricing_mode: "default".to_string(),
            quantity: 1,
            auto_pay: false,
        }
    }
}

impl OrderTarget {
    fn item_request(&self) -> EcoItemRequest {
        EcoItemRequest {
            plan_code: self.plan_code.clone(),
            duration: self.duration.clone(),
            pricing_mode: self.pricing_mode.clone(),
            quantity: self.quantity,
        }
    }

    fn option_request(&self, item_id: u64, plan_code: &str) -> EcoOptionRequest {
        EcoOptionRequest {
            item_id,
            plan_code: plan_code.to_string(),
            duration: self.duration.clone(),
            pricing_mode: self.pricing_mode.clone(),
            quantity: self.quantity,
        }
    }

    fn configurations(&self) -> [ConfigurationRequest; 2] {
        [
            ConfigurationRequest::new("dedicated_datacenter", &self.datacenter),
            ConfigurationRequest::new("dedicated_os", &self.os),
        ]
    }

    fn checkout_request(&self) -> CheckoutRequest {
        CheckoutRequest {
            auto_pay_with_preferred_payment_method: self.auto_pay.then_some(true),
        }
    }
}

/// Workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// What to watch and order
    pub target: OrderTarget,
    /// Sleep after a cycle that did not observe `unavailable`
    pub poll_interval: Duration,
    /// Sleep after an `unavailable` observation
    pub unavailable_interval: Duration,
    /// Unrecoverable error policy
    pub on_fatal_error: OnFatalError,
    /// Intermediate cart step policy
    pub cart_steps: CartSteps,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            target: OrderTarget::default(),
            poll_interval: MIN_POLL_INTERVAL,
            unavailable_interval: MIN_POLL_INTERVAL,
            on_fatal_error: OnFatalError::Abort,
            cart_steps: CartSteps::Checked,
        }
    }
}

/// Workflow states, used for reporting where a cycle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching account context and availability
    Poll,
    /// Telling the operator the server is available
    NotifyAvailable,
    /// Cart → item → options → configuration → checkout
    BuildOrder,
    /// Telling the operator about the order
    NotifyOrder,
    /// Terminal
    Done,
}

impl Stage {
    /// Name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::NotifyAvailable => "notify_available",
            Self::BuildOrder => "build_order",
            Self::NotifyOrder => "notify_order",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum CycleOutcome {
    Unavailable,
    Interrupted(Stage),
    Ordered(OrderResult),
}

/// Polls availability and orders the server once it shows up.
pub struct OrderWorkflow {
    config: WorkflowConfig,
    shop: Arc<dyn ShopApi>,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
    caller: ResilientCaller,
}

impl OrderWorkflow {
    /// Assemble a workflow.
    #[must_use]
    pub fn new(
        config: WorkflowConfig,
        shop: Arc<dyn ShopApi>,
        notifier: Arc<dyn Notifier>,
        sleeper: Arc<dyn Sleeper>,
        caller: ResilientCaller,
    ) -> Self {
        Self {
            config,
            shop,
            notifier,
            sleeper,
            caller,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run until an order is placed and confirmed to the operator.
    ///
    /// # Errors
    ///
    /// Returns the [`WorkflowError`] that ended the loop under
    /// [`OnFatalError::Abort`]. Under [`OnFatalError::Continue`] this only
    /// returns once an order is confirmed.
    pub async fn run(&self) -> Result<OrderResult, WorkflowError> {
        let target = &self.config.target;
        info!(
            plan_code = %target.plan_code,
            datacenter = %target.datacenter,
            "Watching availability"
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            debug!(cycle, "Starting poll cycle");

            match self.run_cycle().await {
                Ok(CycleOutcome::Ordered(result)) => {
                    info!(
                        cycle,
                        order_id = result.order_id,
                        stage = %Stage::Done,
                        "Order placed and confirmed"
                    );
                    return Ok(result);
                }
                Ok(CycleOutcome::Unavailable) => {
                    self.pause(self.config.unavailable_interval).await;
                }
                Ok(CycleOutcome::Interrupted(stage)) => {
                    debug!(cycle, %stage, "Cycle interrupted, polling again");
                    self.pause(self.config.poll_interval).await;
                }
                Err(err) => {
                    error!(cycle, error = %err, "An error occurred");
                    self.report_error(&err).await;

                    match self.config.on_fatal_error {
                        OnFatalError::Abort => return Err(err),
                        OnFatalError::Continue { cooldown } => {
                            warn!(cooldown_secs = cooldown.as_secs(), "Cooling down before next cycle");
                            self.pause(cooldown).await;
                        }
                    }
                }
            }
        }
    }

    async fn run_cycle(&self) -> Result<CycleOutcome, WorkflowError> {
        let label = &self.config.target.label;

        let Some((account, observation)) = self.poll().await? else {
            return Ok(CycleOutcome::Interrupted(Stage::Poll));
        };

        if observation.status.is_unavailable() {
            info!("{label} is not available");
            return Ok(CycleOutcome::Unavailable);
        }

        info!(status = %observation.status, datacenter = %observation.datacenter, "{label} is available");
        if !self.notify(Stage::NotifyAvailable, &format!("{label} is available")).await {
            return Ok(CycleOutcome::Interrupted(Stage::NotifyAvailable));
        }

        let Some(result) = self.build_order(&account).await? else {
            return Ok(CycleOutcome::Interrupted(Stage::BuildOrder));
        };

        let message = format!(
            "Order #{} ({}) has been generated : {}",
            result.order_id, result.total_price_text, result.confirmation_url
        );
        if !self.notify(Stage::NotifyOrder, &message).await {
            return Ok(CycleOutcome::Interrupted(Stage::NotifyOrder));
        }

        Ok(CycleOutcome::Ordered(result))
    }

    async fn poll(&self) -> Result<Option<(Account, AvailabilityObservation)>, WorkflowError> {
        let target = &self.config.target;
        let shop = self.shop.as_ref();

        let Some(account) = self.caller.call("get_account", || shop.account()).await else {
            return Ok(None);
        };

        let Some(records) = self
            .caller
            .call("get_availabilities", || {
                shop.availabilities(&target.datacenter, &target.plan_code)
            })
            .await
        else {
            return Ok(None);
        };

        let Some(record) = records.first() else {
            warn!(plan_code = %target.plan_code, "Availability response is empty");
            return Ok(None);
        };

        let observation = record
            .observation()
            .ok_or_else(|| WorkflowError::MalformedResponse {
                step: "get_availabilities",
                detail: format!("no datacenter entry for plan {}", record.plan_code),
            })?;

        Ok(Some((account, observation)))
    }

    async fn build_order(&self, account: &Account) -> Result<Option<OrderResult>, WorkflowError> {
        let target = &self.config.target;
        let shop = self.shop.as_ref();

        let cart_request = CreateCartRequest {
            ovh_subsidiary: account.ovh_subsidiary.clone(),
        };
        let Some(mut cart) = self
            .caller
            .call("create_cart", || shop.create_cart(&cart_request))
            .await
        else {
            return Ok(None);
        };
        let cart_id = cart.cart_id.clone();
        info!(%cart_id, subsidiary = %account.ovh_subsidiary, "Cart created");

        let assigned = self
            .caller
            .call("assign_cart", || shop.assign_cart(&cart_id))
            .await;
        if !self.step_passed("assign_cart", &cart_id, assigned.is_some()) {
            return Ok(None);
        }

        let item_request = target.item_request();
        let Some(item) = self
            .caller
            .call("add_eco_item", || shop.add_eco_item(&cart_id, &item_request))
            .await
        else {
            return Ok(None);
        };
        let item_id = item.item_id;
        cart.items.push(item_id);
        info!(%cart_id, item_id, plan_code = %target.plan_code, "Item added");

        for plan_code in &target.option_plan_codes {
            let option_request = target.option_request(item_id, plan_code);
            let option = self
                .caller
                .call("add_eco_option", || shop.add_eco_option(&cart_id, &option_request))
                .await;
            if let Some(option) = &option {
                cart.items.push(option.item_id);
                debug!(%cart_id, option_item_id = option.item_id, %plan_code, "Option added");
            }
            if !self.step_passed("add_eco_option", &cart_id, option.is_some()) {
                return Ok(None);
            }
        }

        for configuration in target.configurations() {
            let configured = self
                .caller
                .call("configure_item", || {
                    shop.configure_item(&cart_id, item_id, &configuration)
                })
                .await;
            if !self.step_passed("configure_item", &cart_id, configured.is_some()) {
                return Ok(None);
            }
        }

        if let Some(quotation) = self
            .caller
            .call("get_quotation", || shop.quotation(&cart_id))
            .await
        {
            info!(
                %cart_id,
                items = cart.items.len(),
                price = quotation.price_text().unwrap_or("unknown"),
                "Quotation received"
            );
        }

        let checkout_request = target.checkout_request();
        let Some(order) = self
            .caller
            .call("checkout", || shop.checkout(&cart_id, &checkout_request))
            .await
        else {
            return Ok(None);
        };

        order
            .to_result()
            .map(Some)
            .map_err(|field| WorkflowError::MalformedResponse {
                step: "checkout",
                detail: format!("missing {field}"),
            })
    }

    /// Whether the order attempt may go on after an intermediate step.
    fn step_passed(&self, step: &str, cart_id: &str, succeeded: bool) -> bool {
        if succeeded {
            return true;
        }

        match self.config.cart_steps {
            CartSteps::Checked => {
                warn!(step, cart_id, "Cart step failed, abandoning order attempt");
                false
            }
            CartSteps::BestEffort => {
                warn!(step, cart_id, "Cart step failed, continuing to checkout");
                true
            }
        }
    }

    /// Send `text` through the retry wrapper; `true` only on HTTP 200.
    async fn notify(&self, stage: Stage, text: &str) -> bool {
        let notifier = self.notifier.as_ref();

        match self
            .caller
            .call("send_message", || notifier.send_message(text))
            .await
        {
            Some(delivery) if delivery.is_delivered() => {
                info!(%stage, "Message sent successfully");
                true
            }
            Some(delivery) => {
                warn!(%stage, status = delivery.status, "Failed to send message");
                false
            }
            None => {
                warn!(%stage, "Failed to send message");
                false
            }
        }
    }

    async fn report_error(&self, err: &WorkflowError) {
        match self
            .notifier
            .send_message(&format!("Error occurred: {err}"))
            .await
        {
            Ok(delivery) if delivery.is_delivered() => info!("Error message sent successfully"),
            Ok(delivery) => warn!(status = delivery.status, "Failed to send error message"),
            Err(notify_err) => warn!(error = %notify_err, "Failed to send error message"),
        }
    }

    async fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration.max(MIN_POLL_INTERVAL)).await;
    }
}

impl fmt::Debug for OrderWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderWorkflow")
            .field("config", &self.config)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        let target = OrderTarget::default();
        assert_eq!(target.plan_code, "24ska01");
        assert_eq!(target.datacenter, "bhs");
        assert_eq!(target.option_plan_codes.len(), 2);
        assert_eq!(target.checkout_request(), CheckoutRequest::default());
    }

    #[test]
    fn test_configuration_labels() {
        let [datacenter, os] = OrderTarget::default().configurations();
        assert_eq!(datacenter, ConfigurationRequest::new("dedicated_datacenter", "bhs"));
        assert_eq!(os, ConfigurationRequest::new("dedicated_os", "none_64.en"));
    }

    #[test]
    fn test_auto_pay_checkout_request() {
        let target = OrderTarget {
            auto_pay: true,
            ..OrderTarget::default()
        };
        assert_eq!(
            target.checkout_request().auto_pay_with_preferred_payment_method,
            Some(true)
        );
    }

    #[test]
    fn test_option_request_inherits_pricing() {
        let request = OrderTarget::default().option_request(42, "softraid-1x480ssd-24ska01");
        assert_eq!(request.item_id, 42);
        assert_eq!(request.duration, "P1M");
        assert_eq!(request.pricing_mode, "default");
        assert_eq!(request.quantity, 1);
    }
}
