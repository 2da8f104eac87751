//! nbk-daemon entry point.
//!
//! Thin: tracing, config, store, extractor, middleware, server. Handlers
//! live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use nbk_config::{report_unused_keys, resolve_secrets, ConfigSurface, UnusedKeyPolicy};
use nbk_daemon::{
    extractor::{DisabledExtractor, HttpOrderExtractor, OrderExtractor},
    routes, state,
};
use nbk_db::PgBook;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Production injects env
    // vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = nbk_config::load_from_env().context("config load failed")?;
    let report = report_unused_keys(
        ConfigSurface::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key not read by the daemon");
    }
    let config = loaded.book()?;
    let secrets = resolve_secrets(&config)?;

    let extractor: Arc<dyn OrderExtractor> =
        match HttpOrderExtractor::from_config(&config.extractor, &secrets)? {
            Some(http) => Arc::new(http),
            None => {
                warn!("no extractor endpoint configured; POST /v1/bets will fail");
                Arc::new(DisabledExtractor)
            }
        };

    let pool = nbk_db::connect_from_env().await?;
    nbk_db::migrate(&pool).await?;
    let store = Arc::new(PgBook::new(pool));

    let addr = bind_addr_from_env()
        .or_else(|| config.daemon.addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));

    let shared = Arc::new(
        state::AppState::new(store, extractor, config).with_config_hash(loaded.config_hash),
    );

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!(
        config_hash = shared.config_hash.as_deref().unwrap_or(""),
        today = %shared.today(),
        "nbk-daemon listening on http://{}",
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("NBK_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
