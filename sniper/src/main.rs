//! OVH sniper binary.
//!
//! Configure with environment variables (or a `.env` file), then:
//!
//! ```text
//! RUST_LOG=ovh_sniper=debug cargo run --bin ovh-sniper
//! ```
//!
//! Exits with status 0 once an order has been placed and confirmed to the
//! operator, 1 on a configuration error or an unrecoverable failure.

use ovh_sniper::SniperError;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    init_tracing();

    match ovh_sniper::run_from_env().await {
        Ok(order) => {
            info!(
                order_id = order.order_id,
                total = %order.total_price_text,
                url = %order.confirmation_url,
                "Order placed, exiting"
            );
            ExitCode::SUCCESS
        }
        Err(SniperError::Config(e)) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Sniper stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ovh_sniper=info,ovh_sniper_runtime=info,ovh_sniper_ovh=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
