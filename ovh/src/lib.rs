//! # OVH API Client
//!
//! Signed client for the parts of the OVH API the sniper needs: account
//! context, dedicated server availability, and the eco cart/checkout flow.
//!
//! ## Example
//!
//! ```no_run
//! use ovh_sniper_core::ShopApi;
//! use ovh_sniper_ovh::{Credentials, Endpoint, OvhClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OvhClient::new(
//!         "ovh-ca".parse::<Endpoint>()?,
//!         Credentials {
//!             application_key: "ak".to_string(),
//!             application_secret: "as".to_string(),
//!             consumer_key: "ck".to_string(),
//!         },
//!         Duration::from_secs(30),
//!     )?;
//!
//!     let records = client.availabilities("bhs", "24ska01").await?;
//!     println!("{records:?}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod signature;

// Re-export main types for convenience
pub use client::{Credentials, OvhClient};
pub use endpoint::Endpoint;
pub use error::UnknownEndpoint;
