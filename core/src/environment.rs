//! Environment module - Dependency injection traits
//!
//! All external dependencies are abstracted behind traits and injected into
//! the workflow: time, sleeping, the ordering API and the chat channel.
//! Production implementations live in the client crates; deterministic ones
//! live in `ovh-sniper-testing`.

use crate::error::{ApiError, NotifyError};
use crate::types::{
    Account, Cart, CartItem, CheckoutRequest, ConfigurationRequest, CreateCartRequest, Delivery,
    EcoItemRequest, EcoOptionRequest, ItemConfiguration, Order, ServerAvailability,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use ovh_sniper_core::environment::{Clock, SystemClock};
///
/// let now = SystemClock.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Suspends the control loop.
///
/// The only suspension point of the workflow besides outbound calls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Inventory and ordering operations of the hosting provider.
#[async_trait]
pub trait ShopApi: Send + Sync {
    /// `GET /me`
    async fn account(&self) -> Result<Account, ApiError>;

    /// `GET /dedicated/server/datacenter/availabilities`
    async fn availabilities(
        &self,
        datacenter: &str,
        plan_code: &str,
    ) -> Result<Vec<ServerAvailability>, ApiError>;

    /// `POST /order/cart`
    async fn create_cart(&self, request: &CreateCartRequest) -> Result<Cart, ApiError>;

    /// `POST /order/cart/{cartId}/assign`
    async fn assign_cart(&self, cart_id: &str) -> Result<(), ApiError>;

    /// `POST /order/cart/{cartId}/eco`
    async fn add_eco_item(
        &self,
        cart_id: &str,
        request: &EcoItemRequest,
    ) -> Result<CartItem, ApiError>;

    /// `POST /order/cart/{cartId}/eco/options`
    async fn add_eco_option(
        &self,
        cart_id: &str,
        request: &EcoOptionRequest,
    ) -> Result<CartItem, ApiError>;

    /// `POST /order/cart/{cartId}/item/{itemId}/configuration`
    async fn configure_item(
        &self,
        cart_id: &str,
        item_id: u64,
        request: &ConfigurationRequest,
    ) -> Result<ItemConfiguration, ApiError>;

    /// `GET /order/cart/{cartId}/checkout`
    async fn quotation(&self, cart_id: &str) -> Result<Order, ApiError>;

    /// `POST /order/cart/{cartId}/checkout`
    async fn checkout(&self, cart_id: &str, request: &CheckoutRequest) -> Result<Order, ApiError>;
}

/// Operator chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to the operator.
    ///
    /// A reachable API that refuses the message yields `Ok` with a
    /// non-200 [`Delivery`]; only transport problems are errors.
    async fn send_message(&self, text: &str) -> Result<Delivery, NotifyError>;
}
