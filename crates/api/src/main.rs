use std::sync::Arc;

use anyhow::Context;

use signon_api::app::{self, services::AppServices};
use signon_revocation::{HttpRevocationClient, RevocationConfig, SuspensionWorkflow};

const ENV_BIND_ADDR: &str = "SIGNON_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    signon_observability::init();

    let config = RevocationConfig::from_env().context("invalid revocation configuration")?;
    let client = HttpRevocationClient::new(&config).context("failed to build revocation client")?;
    tracing::info!(
        timeout_ms = config.timeout.as_millis() as u64,
        max_in_flight = ?config.max_in_flight,
        "revocation workflow configured"
    );

    let services = Arc::new(AppServices::in_memory(SuspensionWorkflow::new(client, config)));
    let app = app::build_app(services);

    let bind_addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
