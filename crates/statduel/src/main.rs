//! Statduel server binary.
//!
//! Reads the bind address from `STATDUEL_ADDR` (default
//! `127.0.0.1:8080`) and log filtering from `RUST_LOG`.

use statduel::{StatduelError, StatduelServerBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), StatduelError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("statduel=info")),
        )
        .init();

    let addr = std::env::var("STATDUEL_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = StatduelServerBuilder::new().bind(&addr).build().await?;
    tracing::info!(%addr, "listening");
    server.run().await
}
