mod auth;
mod config;
mod db;
mod errors;
mod models;
mod render;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::google::GoogleTokenVerifier;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Store;
use crate::render::{load_fonts, CardRenderer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signcard v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite store
    let store = Store::connect(&config.database_url).await?;
    store.initialize().await?;

    // Initialize renderer and upload area
    tokio::fs::create_dir_all(config.cards_upload_dir()).await?;
    let fonts = load_fonts(config.font_dir.as_deref(), &config.fallback_font_family);
    let renderer = CardRenderer::new(config.data_dir.clone(), config.generated_dir(), fonts)?;
    info!(
        "Writing generated cards to {} ({} font faces available)",
        renderer.generated_dir().display(),
        renderer.font_count()
    );

    // Initialize identity verification
    let verifier = GoogleTokenVerifier::new(config.google_client_id.clone())?;
    let auth = Authenticator::new(
        Arc::new(verifier),
        config.admin_emails.clone(),
        config.admin_bypass_secret.clone(),
    );
    info!("{} admin email(s) configured", config.admin_emails.len());
    if config.admin_bypass_secret.is_some() {
        warn!("ADMIN_BYPASS_SECRET is set: shared-secret admin access is enabled");
    }

    // Build app state
    let state = AppState {
        store: store.clone(),
        renderer: Arc::new(renderer),
        auth: Arc::new(auth),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
