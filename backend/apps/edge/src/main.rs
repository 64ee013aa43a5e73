//! Edge Server Entry Point
//!
//! Runs the auth gateway in front of the auth hub application.
//! Uses `anyhow` for startup errors, but request-level
//! errors should use `kernel::error::AppError`.

mod settings;
mod upstream;

use anyhow::Context;
use axum::{Json, Router, routing::get};
use gateway::{GoTrueClient, with_auth_gateway};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;
use crate::upstream::{Upstream, proxy};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Health route and upstream proxy, without the gateway
fn routes(upstream: Upstream) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .fallback(proxy)
        .with_state(upstream)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge=info,gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let config = settings.gateway_config();

    tracing::info!(
        environment = settings.environment.as_str(),
        canonical_host = %config.host.canonical_host,
        session_cookie = %config.session_cookie.cookie_name(),
        upstream = %settings.upstream_url,
        trust_forwarded_headers = config.trust_forwarded_headers,
        "Gateway configured"
    );

    let provider = GoTrueClient::new(
        &settings.supabase_url,
        settings.supabase_anon_key.clone(),
        settings.provider_timeout,
    )
    .context("failed to create auth provider client")?;
    let upstream = Upstream::new(settings.upstream_url.clone(), settings.upstream_timeout)
        .context("failed to create upstream client")?;

    // Build router
    let app = with_auth_gateway(routes(upstream), provider, config)
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("Listening on {}", settings.listen_addr);

    let listener = TcpListener::bind(settings.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
