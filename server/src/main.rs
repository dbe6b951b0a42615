use lens::{Config, MappingTables};
use server_lib::{AppState, build_router};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("Data directory: {}", config.data_dir.display());

    let tables = MappingTables::load_or_builtin(config.mapping_tables_path.as_deref())?;
    info!(
        "Mapping tables {}: {} company, {} line entries",
        tables.version,
        tables.company.len(),
        tables.line.len()
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, tables)?;
    if !state.mlit.has_api_key() {
        warn!("MLIT_API_KEY is not set; station lookups will be rejected");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down gracefully...");
}
