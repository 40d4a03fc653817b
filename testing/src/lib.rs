//! # OVH Sniper Testing
//!
//! Test doubles for the environment traits of `ovh-sniper-core`.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic time
//! - [`RecordingSleeper`]: returns immediately, remembers every requested delay
//! - [`RecordingNotifier`]: captures messages, answers with scripted statuses
//! - [`ScriptedShop`]: in-memory ordering API with scripted availability
//!   and injectable failures
//!
//! ## Example
//!
//! ```
//! use ovh_sniper_testing::{RecordingNotifier, ScriptedShop};
//!
//! let shop = ScriptedShop::new().with_availability(["unavailable", "available"]);
//! let notifier = RecordingNotifier::new();
//! assert!(shop.calls().is_empty());
//! assert!(notifier.messages().is_empty());
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ovh_sniper_core::{
    Account, ApiError, AvailabilityStatus, Cart, CartItem, CheckoutRequest, Clock,
    ConfigurationRequest, CreateCartRequest, DatacenterAvailability, Delivery, EcoItemRequest,
    EcoOptionRequest, ItemConfiguration, Notifier, NotifyError, Order, OrderPrices, Price,
    ServerAvailability, ShopApi, Sleeper,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Lock a mutex, ignoring poisoning from a panicked test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install a test-friendly tracing subscriber (idempotent).
///
/// Honors `RUST_LOG`; output goes through the test harness capture.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making signatures reproducible.
///
/// # Example
///
/// ```
/// use ovh_sniper_testing::FixedClock;
/// use ovh_sniper_core::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
}

/// Sleeper that never waits and records what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}

/// Notifier that captures messages.
///
/// Each send consumes the next scripted outcome; once the script is empty
/// every message is delivered with HTTP 200.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    outcomes: Mutex<VecDeque<Result<u16, NotifyError>>>,
}

impl RecordingNotifier {
    /// Notifier that delivers everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the first sends with these HTTP statuses.
    #[must_use]
    pub fn with_statuses(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self::with_outcomes(statuses.into_iter().map(Ok))
    }

    /// Answer the first sends with these outcomes.
    #[must_use]
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<u16, NotifyError>>) -> Self {
        Self {
            messages: Mutex::default(),
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    /// Every message that was attempted, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<Delivery, NotifyError> {
        lock(&self.messages).push(text.to_string());
        let outcome = lock(&self.outcomes).pop_front().unwrap_or(Ok(200));
        outcome.map(|status| Delivery { status })
    }
}

/// A call received by [`ScriptedShop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopCall {
    /// `GET /me`
    Account,
    /// `GET /dedicated/server/datacenter/availabilities`
    Availabilities {
        /// Queried datacenter
        datacenter: String,
        /// Queried plan code
        plan_code: String,
    },
    /// `POST /order/cart`
    CreateCart(CreateCartRequest),
    /// `POST /order/cart/{cartId}/assign`
    AssignCart {
        /// Cart
        cart_id: String,
    },
    /// `POST /order/cart/{cartId}/eco`
    AddEcoItem {
        /// Cart
        cart_id: String,
        /// Body
        request: EcoItemRequest,
    },
    /// `POST /order/cart/{cartId}/eco/options`
    AddEcoOption {
        /// Cart
        cart_id: String,
        /// Body
        request: EcoOptionRequest,
    },
    /// `POST /order/cart/{cartId}/item/{itemId}/configuration`
    ConfigureItem {
        /// Cart
        cart_id: String,
        /// Item
        item_id: u64,
        /// Body
        request: ConfigurationRequest,
    },
    /// `GET /order/cart/{cartId}/checkout`
    Quotation {
        /// Cart
        cart_id: String,
    },
    /// `POST /order/cart/{cartId}/checkout`
    Checkout {
        /// Cart
        cart_id: String,
        /// Body
        request: CheckoutRequest,
    },
}

impl ShopCall {
    /// Operation name, matching the names accepted by [`ScriptedShop::fail`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Availabilities { .. } => "availabilities",
            Self::CreateCart(_) => "create_cart",
            Self::AssignCart { .. } => "assign_cart",
            Self::AddEcoItem { .. } => "add_eco_item",
            Self::AddEcoOption { .. } => "add_eco_option",
            Self::ConfigureItem { .. } => "configure_item",
            Self::Quotation { .. } => "quotation",
            Self::Checkout { .. } => "checkout",
        }
    }
}

/// Availability response with one record and one datacenter entry.
#[must_use]
pub fn availability_response(plan_code: &str, datacenter: &str, status: &str) -> Vec<ServerAvailability> {
    vec![ServerAvailability {
        plan_code: plan_code.to_string(),
        fqn: None,
        server: Some(plan_code.to_string()),
        memory: None,
        storage: None,
        datacenters: vec![DatacenterAvailability {
            datacenter: datacenter.to_string(),
            availability: AvailabilityStatus::from(status),
        }],
    }]
}

/// Checkout answer used by [`ScriptedShop`] unless overridden.
#[must_use]
pub fn sample_order() -> Order {
    Order {
        order_id: Some(123_456_789),
        url: Some(
            "https://www.ovh.com/cgi-bin/order/displayOrder.cgi?orderId=123456789".to_string(),
        ),
        prices: OrderPrices {
            with_tax: Some(Price {
                text: "29.99 CAD".to_string(),
                value: 29.99,
                currency_code: "CAD".to_string(),
            }),
            without_tax: None,
        },
    }
}

#[derive(Debug)]
struct ShopState {
    calls: Vec<ShopCall>,
    responses: VecDeque<Vec<ServerAvailability>>,
    last_response: Vec<ServerAvailability>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    subsidiary: String,
    checkout: Order,
    next_cart: u64,
    next_item: u64,
    next_configuration: u64,
}

/// In-memory ordering API.
///
/// Availability answers are consumed in order; the last one repeats once
/// the script runs out. Failures queued with [`ScriptedShop::fail`] are
/// returned by the next calls of the named operation.
#[derive(Debug)]
pub struct ScriptedShop {
    state: Mutex<ShopState>,
}

impl Default for ScriptedShop {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedShop {
    /// Shop that always reports `24ska01` as unavailable in `bhs`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ShopState {
                calls: Vec::new(),
                responses: VecDeque::new(),
                last_response: availability_response("24ska01", "bhs", "unavailable"),
                failures: HashMap::new(),
                subsidiary: "CA".to_string(),
                checkout: sample_order(),
                next_cart: 1,
                next_item: 100,
                next_configuration: 1,
            }),
        }
    }

    /// Script the availability of `24ska01` in `bhs`, one status per poll.
    #[must_use]
    pub fn with_availability<'a>(self, statuses: impl IntoIterator<Item = &'a str>) -> Self {
        self.with_responses(
            statuses
                .into_iter()
                .map(|status| availability_response("24ska01", "bhs", status)),
        )
    }

    /// Script raw availability responses, one per poll.
    #[must_use]
    pub fn with_responses(self, responses: impl IntoIterator<Item = Vec<ServerAvailability>>) -> Self {
        lock(&self.state).responses.extend(responses);
        self
    }

    /// Answer checkout with `order`.
    #[must_use]
    pub fn with_checkout(self, order: Order) -> Self {
        lock(&self.state).checkout = order;
        self
    }

    /// Fail the next `times` calls of `operation` with `error`.
    #[must_use]
    pub fn fail(self, operation: &'static str, error: ApiError, times: usize) -> Self {
        lock(&self.state)
            .failures
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ShopCall> {
        lock(&self.state).calls.clone()
    }

    /// Names of every call received, in order.
    #[must_use]
    pub fn call_names(&self) -> Vec<&'static str> {
        lock(&self.state).calls.iter().map(ShopCall::name).collect()
    }

    /// Number of calls of `operation`.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.name() == operation)
            .count()
    }

    /// Record `call` and pop a scripted failure for it, if any.
    fn record(&self, call: ShopCall) -> Result<MutexGuard<'_, ShopState>, ApiError> {
        let mut state = lock(&self.state);
        let name = call.name();
        state.calls.push(call);

        match state.failures.get_mut(name).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ShopApi for ScriptedShop {
    async fn account(&self) -> Result<Account, ApiError> {
        let state = self.record(ShopCall::Account)?;
        Ok(Account {
            ovh_subsidiary: state.subsidiary.clone(),
            nichandle: Some("ab12345-ovh".to_string()),
        })
    }

    async fn availabilities(
        &self,
        datacenter: &str,
        plan_code: &str,
    ) -> Result<Vec<ServerAvailability>, ApiError> {
        let mut state = self.record(ShopCall::Availabilities {
            datacenter: datacenter.to_string(),
            plan_code: plan_code.to_string(),
        })?;

        if let Some(response) = state.responses.pop_front() {
            state.last_response = response;
        }
        Ok(state.last_response.clone())
    }

    async fn create_cart(&self, request: &CreateCartRequest) -> Result<Cart, ApiError> {
        let mut state = self.record(ShopCall::CreateCart(request.clone()))?;
        let cart_id = format!("cart-{}", state.next_cart);
        state.next_cart += 1;

        Ok(Cart {
            cart_id,
            expire: Some("2025-01-02T00:00:00+00:00".to_string()),
            items: Vec::new(),
            read_only: false,
        })
    }

    async fn assign_cart(&self, cart_id: &str) -> Result<(), ApiError> {
        self.record(ShopCall::AssignCart {
            cart_id: cart_id.to_string(),
        })?;
        Ok(())
    }

    async fn add_eco_item(
        &self,
        cart_id: &str,
        request: &EcoItemRequest,
    ) -> Result<CartItem, ApiError> {
        let mut state = self.record(ShopCall::AddEcoItem {
            cart_id: cart_id.to_string(),
            request: request.clone(),
        })?;
        let item_id = state.next_item;
        state.next_item += 1;

        Ok(CartItem {
            item_id,
            cart_id: Some(cart_id.to_string()),
            duration: Some(request.duration.clone()),
        })
    }

    async fn add_eco_option(
        &self,
        cart_id: &str,
        request: &EcoOptionRequest,
    ) -> Result<CartItem, ApiError> {
        let mut state = self.record(ShopCall::AddEcoOption {
            cart_id: cart_id.to_string(),
            request: request.clone(),
        })?;
        let item_id = state.next_item;
        state.next_item += 1;

        Ok(CartItem {
            item_id,
            cart_id: Some(cart_id.to_string()),
            duration: Some(request.duration.clone()),
        })
    }

    async fn configure_item(
        &self,
        cart_id: &str,
        item_id: u64,
        request: &ConfigurationRequest,
    ) -> Result<ItemConfiguration, ApiError> {
        let mut state = self.record(ShopCall::ConfigureItem {
            cart_id: cart_id.to_string(),
            item_id,
            request: request.clone(),
        })?;
        let id = state.next_configuration;
        state.next_configuration += 1;

        Ok(ItemConfiguration {
            id,
            label: request.label.clone(),
            value: request.value.clone(),
        })
    }

    async fn quotation(&self, cart_id: &str) -> Result<Order, ApiError> {
        let state = self.record(ShopCall::Quotation {
            cart_id: cart_id.to_string(),
        })?;

        Ok(Order {
            order_id: None,
            url: None,
            prices: state.checkout.prices.clone(),
        })
    }

    async fn checkout(&self, cart_id: &str, request: &CheckoutRequest) -> Result<Order, ApiError> {
        let state = self.record(ShopCall::Checkout {
            cart_id: cart_id.to_string(),
            request: request.clone(),
        })?;
        Ok(state.checkout.clone())
    }
}
