//! Entry point for the Price Estimator binary.
//!
//! Running this binary starts an HTTP server that exposes the price
//! estimator.  Settings are read from the environment (see
//! [`price_estimator::config::Settings`]); `RUST_LOG` overrides the
//! configured log level.

use price_estimator::config::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        catalog_dir = ?settings.catalog_dir,
        "starting price estimator"
    );
    if let Err(err) = price_estimator::api::serve(settings.bind_addr, settings.catalog_dir).await {
        tracing::error!(%err, "server terminated");
        return Err(err);
    }
    Ok(())
}
