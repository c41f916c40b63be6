use vpn_panel::background::token_sweeper::SweeperHandle;
use vpn_panel::config::AppConfig;
use vpn_panel::routes;
use vpn_panel::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let config = AppConfig::from_env();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting vpn-panel v{}", env!("CARGO_PKG_VERSION"));
    if !dotenv_loaded {
        tracing::info!("No .env file loaded, using process environment");
    }
    tracing::info!(
        vpn_clients_dir = %config.vpn_clients_dir.display(),
        antizapret_clients_dir = %config.antizapret_clients_dir.display(),
        client_script = %config.client_script_path.display(),
        token_lifetime_secs = config.token_lifetime_secs,
        token_sweep_interval_secs = config.token_sweep_interval_secs,
        "Configuration loaded"
    );

    let state = AppState::new(config.clone());

    let sweeper = SweeperHandle::spawn(state.tokens.clone(), config.token_sweep_interval());

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Waiting for background tasks to finish");
    sweeper.stop().await;

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
