//! btsim-daemon entry point.
//!
//! This file is intentionally thin: it loads config, builds the shared
//! state, wires middleware, and starts the HTTP server. All route handlers
//! live in `routes.rs`; all shared state types live in `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use btsim_account::Registry;
use btsim_config::{BtsimConfig, PersistenceBackend};
use btsim_daemon::{routes, state};
use btsim_feed::MemoryFeed;
use btsim_persistence::{FileStore, MemoryStore, SnapshotStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = Arc::new(load_config()?);
    info!(
        bind_address = %config.server.bind_address,
        route_prefix = %config.server.route_prefix,
        "loaded config"
    );

    let store: Arc<dyn SnapshotStore> = match config.persistence.backend {
        PersistenceBackend::Memory => Arc::new(MemoryStore::new()),
        PersistenceBackend::File => Arc::new(FileStore::new(config.persistence.root.clone())),
    };

    // No network feed is in scope: the daemon boots against an
    // empty in-memory feed. A real deployment seeds it out-of-band before
    // traffic arrives, or swaps in another `Feed` implementation entirely.
    let feed = Arc::new(MemoryFeed::builder().build());

    let registry = Arc::new(Registry::new(
        feed,
        store,
        Duration::from_secs(config.trading.feed_timeout_secs),
        config.trading.suspension_blocks_all_trading,
    ));

    let shared = Arc::new(state::AppState::new(registry, config.clone()));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer());

    let addr: SocketAddr = config.server.bind_address.parse()?;
    info!("btsim-daemon listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layers `btsim.base.yaml` with an optional `BTSIM_CONFIG_OVERLAY`-named
/// file, mirroring layered-YAML config model.
fn load_config() -> Result<BtsimConfig, Box<dyn std::error::Error>> {
    let mut paths = vec!["btsim.base.yaml".to_string()];
    if let Ok(overlay) = std::env::var("BTSIM_CONFIG_OVERLAY") {
        paths.push(overlay);
    }
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();

    let loaded = if path_refs.iter().all(|p| !std::path::Path::new(p).exists()) {
        btsim_config::load_layered_yaml_from_strings(&["{}"])?
    } else {
        btsim_config::load_layered_yaml(&path_refs)?
    };
    Ok(BtsimConfig::from_loaded(&loaded)?)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
