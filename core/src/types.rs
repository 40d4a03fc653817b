//! Wire and domain types.
//!
//! Field names follow the OVH API (camelCase on the wire). Response types
//! are lenient: optional fields default instead of failing the decode, so
//! the workflow can tell a malformed answer apart from a failed call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account context returned by `GET /me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Regional/billing subsidiary (e.g. `CA`, `FR`), required to create a cart
    pub ovh_subsidiary: String,
    /// Account handle
    #[serde(default)]
    pub nichandle: Option<String>,
}

/// Availability of a plan in one datacenter, as reported by OVH.
///
/// OVH uses free-form strings such as `unavailable`, `1H-low` or `72H`.
/// Only `unavailable` stops an order attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AvailabilityStatus {
    /// Reported literally as `available`
    Available,
    /// Reported as `unavailable`
    Unavailable,
    /// Any other label (delivery estimate, `unknown`, ...)
    Other(String),
}

impl AvailabilityStatus {
    /// `true` only for the `unavailable` label.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for AvailabilityStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "available" => Self::Available,
            "unavailable" => Self::Unavailable,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for AvailabilityStatus {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<AvailabilityStatus> for String {
    fn from(status: AvailabilityStatus) -> Self {
        match status {
            AvailabilityStatus::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One datacenter entry of an availability record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterAvailability {
    /// Datacenter code (e.g. `bhs`)
    pub datacenter: String,
    /// Availability label
    pub availability: AvailabilityStatus,
}

/// One record of `GET /dedicated/server/datacenter/availabilities`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAvailability {
    /// Plan code the record refers to
    pub plan_code: String,
    /// Fully qualified hardware name
    #[serde(default)]
    pub fqn: Option<String>,
    /// Server hardware code
    #[serde(default)]
    pub server: Option<String>,
    /// Memory addon code
    #[serde(default)]
    pub memory: Option<String>,
    /// Storage addon code
    #[serde(default)]
    pub storage: Option<String>,
    /// Per-datacenter availability
    #[serde(default)]
    pub datacenters: Vec<DatacenterAvailability>,
}

impl ServerAvailability {
    /// Observation built from the first datacenter entry, if any.
    #[must_use]
    pub fn observation(&self) -> Option<AvailabilityObservation> {
        self.datacenters
            .first()
            .map(|entry| AvailabilityObservation {
                datacenter: entry.datacenter.clone(),
                plan_code: self.plan_code.clone(),
                status: entry.availability.clone(),
            })
    }
}

/// What a single poll cycle saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailabilityObservation {
    /// Datacenter code
    pub datacenter: String,
    /// Plan code
    pub plan_code: String,
    /// Reported status
    pub status: AvailabilityStatus,
}

/// Body of `POST /order/cart`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartRequest {
    /// Subsidiary taken from the account context
    pub ovh_subsidiary: String,
}

/// A server-side cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart identifier
    pub cart_id: String,
    /// Expiration date (ISO 8601)
    #[serde(default)]
    pub expire: Option<String>,
    /// Item identifiers, in insertion order
    #[serde(default)]
    pub items: Vec<u64>,
    /// Whether the cart is locked (after checkout)
    #[serde(default)]
    pub read_only: bool,
}

/// Body of `POST /order/cart/{cartId}/eco`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoItemRequest {
    /// Plan code to order
    pub plan_code: String,
    /// Commitment duration (ISO 8601, e.g. `P1M`)
    pub duration: String,
    /// Pricing mode (e.g. `default`)
    pub pricing_mode: String,
    /// Number of servers
    pub quantity: u32,
}

/// Body of `POST /order/cart/{cartId}/eco/options`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoOptionRequest {
    /// Item the option attaches to
    pub item_id: u64,
    /// Option plan code
    pub plan_code: String,
    /// Commitment duration
    pub duration: String,
    /// Pricing mode
    pub pricing_mode: String,
    /// Quantity
    pub quantity: u32,
}

/// A cart line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Item identifier
    pub item_id: u64,
    /// Owning cart
    #[serde(default)]
    pub cart_id: Option<String>,
    /// Commitment duration
    #[serde(default)]
    pub duration: Option<String>,
}

/// Body of `POST /order/cart/{cartId}/item/{itemId}/configuration`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    /// Configuration label (e.g. `dedicated_datacenter`)
    pub label: String,
    /// Value for the label
    pub value: String,
}

impl ConfigurationRequest {
    /// Build a label/value pair.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A configuration value attached to an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemConfiguration {
    /// Configuration identifier
    pub id: u64,
    /// Label
    pub label: String,
    /// Value
    pub value: String,
}

/// Body of `POST /order/cart/{cartId}/checkout`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Pay the order right away with the account's preferred payment method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_pay_with_preferred_payment_method: Option<bool>,
}

/// A price as OVH formats it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Human readable text (e.g. `24.99 CAD`)
    pub text: String,
    /// Numeric value
    #[serde(default)]
    pub value: f64,
    /// ISO currency code
    #[serde(default)]
    pub currency_code: String,
}

/// Price breakdown of an order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPrices {
    /// Total including tax
    #[serde(default)]
    pub with_tax: Option<Price>,
    /// Total excluding tax
    #[serde(default)]
    pub without_tax: Option<Price>,
}

/// Response of the checkout resource.
///
/// `GET` (quotation) leaves `order_id` and `url` empty; `POST` fills them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    #[serde(default)]
    pub order_id: Option<u64>,
    /// Confirmation / payment URL
    #[serde(default)]
    pub url: Option<String>,
    /// Prices
    #[serde(default)]
    pub prices: OrderPrices,
}

impl Order {
    /// Price text including tax, if present.
    #[must_use]
    pub fn price_text(&self) -> Option<&str> {
        self.prices.with_tax.as_ref().map(|price| price.text.as_str())
    }

    /// Extract the order result.
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing field.
    pub fn to_result(&self) -> Result<OrderResult, &'static str> {
        let order_id = self.order_id.ok_or("orderId")?;
        let total_price_text = self.price_text().ok_or("prices.withTax.text")?.to_string();
        let confirmation_url = self.url.clone().ok_or("url")?;

        Ok(OrderResult {
            order_id,
            total_price_text,
            confirmation_url,
        })
    }
}

/// The terminal artifact of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderResult {
    /// Order identifier
    pub order_id: u64,
    /// Price text including tax
    pub total_price_text: String,
    /// Confirmation URL
    pub confirmation_url: String,
}

/// Outcome of posting a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status returned by the chat API
    pub status: u16,
}

impl Delivery {
    /// Only HTTP 200 counts as delivered.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        self.status == 200
    }
}
