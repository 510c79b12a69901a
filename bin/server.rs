// Slambana Dashboard - Web Server
// REST API with Axum: player roster + start.gg proxy

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use slambana_dashboard::{
    build_router, cors_layer, AppState, Config, ReconcileOptions, RosterStore, StartGgClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env();

    let store = RosterStore::open(&config.roster_path).with_context(|| {
        format!("Failed to open roster at {}", config.roster_path.display())
    })?;
    info!(path = %config.roster_path.display(), players = store.count(), "roster ready");

    // Create shared state
    let state = AppState {
        store: Arc::new(store),
        startgg: Arc::new(StartGgClient::new(
            config.startgg_endpoint.clone(),
            config.token_path.clone(),
        )),
        import_options: ReconcileOptions {
            collapse_duplicates: config.collapse_duplicate_imports,
        },
    };

    let app = build_router(state).layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    info!(addr = %config.listen_addr, "server running");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slambana_dashboard=info,slambana_server=info,warn")),
        )
        .with_target(true)
        .with_line_number(true)
        .init();
}
