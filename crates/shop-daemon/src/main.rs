//! shop-daemon entry point.
//!
//! Thin on purpose: tracing, config, database, shared state, middleware,
//! then serve. Handlers live in `routes.rs`, the action flow in `action.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method};
use shop_config::{config_paths_from_env, load_layered_yaml, ShopConfig};
use shop_daemon::{routes, state};
use shop_db::PgOrderStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs).context("load config")?;
    let config = ShopConfig::from_loaded(&loaded).context("resolve config")?;
    info!(
        config_hash = %loaded.config_hash,
        link_mode = config.link_mode.as_str(),
        base_url = %config.base_url,
        "config loaded"
    );

    let pool = shop_db::connect_from_env().await?;
    shop_db::migrate(&pool).await?;
    let store = Arc::new(PgOrderStore::new(pool));

    let cors = cors_for_base_url(&config)?;
    let shared = Arc::new(state::AppState::new(config, store).context("build app state")?);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));
    info!("shop-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("shop-daemon stopped");
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
    std::env::var("SHOP_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: only the storefront's own origin may call the admin routes.
fn cors_for_base_url(config: &ShopConfig) -> anyhow::Result<CorsLayer> {
    let origin = config.base_url.origin().ascii_serialization();
    let origin = HeaderValue::from_str(&origin).context("base url origin is not a valid header")?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(routes::ADMIN_KEY_HEADER),
        ]))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler: run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
