//! Liveness endpoint for the hosting platform's health checks.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use fieldlog_core::Clock;
use tracing::info;

pub fn router(clock: Arc<dyn Clock>) -> Router {
    Router::new().route("/ping", get(ping)).with_state(clock)
}

async fn ping(State(clock): State<Arc<dyn Clock>>) -> String {
    format!("Bot is running! Moscow time: {}", clock.datetime_str())
}

pub async fn serve(port: u16, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "liveness endpoint listening");
    axum::serve(listener, router(clock)).await?;
    Ok(())
}
