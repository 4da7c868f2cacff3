//! FormTrap Server
//!
//! Hosts a honeypot-protected form and the administrative surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    FORMTRAP SERVER                       │
//! ├──────────────────────────────────────────────────────────┤
//! │  request ─▶ TraceLayer ─▶ honeypot_gate ─▶ handlers      │
//! │                              │                           │
//! │                              ▼                           │
//! │                 ┌─────────────────────────┐              │
//! │                 │  FormTrap (core engine) │──▶ webhooks  │
//! │                 │  bans · markers · log   │              │
//! │                 └─────────────────────────┘              │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod middleware;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::get,
    middleware as axum_middleware,
};
use formtrap_core::FormTrap;
use tower_http::{
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "formtrap_server=debug,formtrap_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env().context("invalid configuration")?;

    tracing::info!("FormTrap server starting...");
    tracing::info!(
        webhooks = config.trap.webhooks.len(),
        decoys = config.trap.decoys.len(),
        trust_forwarded = config.trust_forwarded,
        "configuration loaded"
    );

    let trap = FormTrap::new(config.trap.clone()).context("failed to build honeypot engine")?;

    // Build application state
    let state = AppState {
        trap: Arc::new(trap),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub trap: Arc<FormTrap>,
    pub config: config::Config,
}

/// Create the main router; every route sits behind the honeypot gate
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::form::show).post(handlers::form::submit))
        .route("/health", get(handlers::health::check))
        .route(
            handlers::admin::ADMIN_PATH,
            get(handlers::admin::page).post(handlers::admin::action),
        )
        .route(handlers::admin::EXPORT_PATH, get(handlers::admin::export))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::gate::honeypot_gate,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
