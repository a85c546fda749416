use axum::serve;
use route_binding::config::AppConfig;
use route_binding::{build_app, connect_store};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info) // Default to Info for everything
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .parse_default_env() // RUST_LOG still wins
        .init();

    log::info!("route-binding: blog demo server");

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{} store={:?}",
        config.server.host,
        config.server.port,
        config.database.backend
    );

    let store = connect_store(&config).await?;
    let app = build_app(store, config.binding.verify_on_boot)?;

    run_server(app, &config).await
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Server running on http://{}", bind_address);
    log::info!("Bound routes listed at http://{}/routes", bind_address);

    serve(listener, app).await?;

    Ok(())
}
