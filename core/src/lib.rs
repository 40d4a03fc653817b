//! # OVH Sniper Core
//!
//! Shared vocabulary for the order sniper: the wire types exchanged with the
//! OVH ordering API, the error taxonomy used to decide what is worth retrying,
//! and the environment traits behind which every side effect lives.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐   ShopApi    ┌──────────────┐
//! │   OrderWorkflow   │─────────────►│  OVH client  │
//! │ (runtime crate)   │   Notifier   ├──────────────┤
//! │                   │─────────────►│ Telegram bot │
//! │                   │   Sleeper    ├──────────────┤
//! │                   │─────────────►│ tokio::time  │
//! └───────────────────┘              └──────────────┘
//! ```
//!
//! Production wiring plugs the real clients in; tests plug in the mocks
//! from `ovh-sniper-testing`. Nothing in this crate performs I/O.

pub mod environment;
pub mod error;
pub mod types;

pub use environment::{Clock, Notifier, ShopApi, Sleeper, SystemClock};
pub use error::{ApiError, NotifyError, Retryable};
pub use types::{
    Account, AvailabilityObservation, AvailabilityStatus, Cart, CartItem, CheckoutRequest,
    ConfigurationRequest, CreateCartRequest, DatacenterAvailability, Delivery, EcoItemRequest,
    EcoOptionRequest, ItemConfiguration, Order, OrderPrices, OrderResult, Price,
    ServerAvailability,
};
