//! Bloom Tutor · curriculum question classifier backend
//!
//! - Classifies student questions against a teacher's curriculum with one LLM call:
//!   relevance, Bloom taxonomy level, question quality (1–5)
//! - Generates free-text learning paths on request
//! - Axum HTTP + WebSocket API, per-session curriculum/history (in memory only)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   GEMINI_API_KEY           : enables the model client if present
//!   GEMINI_BASE_URL          : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL             : default "gemini-1.5-flash"
//!   BLOOM_TUTOR_CONFIG_PATH  : path to TOML config (decoding options, limits, prompts)
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod prompt;
mod normalize;
mod history;
mod gemini;
mod state;
mod logic;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: session registry, prompts, decoding options, model client.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "bloom_tutor", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "bloom_tutor", "Server stopped");
  Ok(())
}

/// Resolve on Ctrl+C so in-flight requests can finish.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "bloom_tutor", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
