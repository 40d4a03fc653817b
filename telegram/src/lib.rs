//! # Telegram Notifier
//!
//! Posts operator notifications through the Telegram Bot API
//! (`sendMessage`). Implements [`ovh_sniper_core::Notifier`].
//!
//! ## Example
//!
//! ```no_run
//! use ovh_sniper_core::Notifier;
//! use ovh_sniper_telegram::TelegramNotifier;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notifier = TelegramNotifier::new(
//!         "https://api.telegram.org",
//!         "123456:ABC",
//!         "42",
//!         Duration::from_secs(30),
//!     )?;
//!
//!     let delivery = notifier.send_message("KSA is available").await?;
//!     println!("delivered: {}", delivery.is_delivered());
//!     Ok(())
//! }
//! ```

pub mod client;

pub use client::{DEFAULT_API_URL, TelegramNotifier};
