use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curator_core::{
    create_access_policy, create_relay_authenticator, create_store, load_config, validate_config,
    CardAuthor, CatalogStore, CatalogingContext, Cataloger, DiscordMessenger, Messenger,
    ReplyHub, Wizard,
};
use curator_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CURATOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Relay auth method: {:?}", config.relay.method);
    info!(
        "Store: {:?} at {:?}",
        config.database.backend, config.database.path
    );

    let relay =
        create_relay_authenticator(&config.relay).context("Failed to create relay authenticator")?;
    info!("Using relay authenticator: {}", relay.method_name());

    let policy = create_access_policy(&config.access);
    info!("Using access policy: {}", policy.name());

    let store = create_store(&config.database).context("Failed to open store")?;
    info!(
        "Store opened with {} entries",
        store.entry_count().context("Failed to read store")?
    );

    let messenger: Arc<dyn Messenger> = Arc::new(
        DiscordMessenger::new(config.discord.clone()).context("Failed to create Discord client")?,
    );
    info!("Messenger initialized: {}", messenger.name());

    let wizard = Wizard::new(
        ReplyHub::new(),
        Arc::clone(&messenger),
        Duration::from_secs(config.wizard.reply_timeout_secs),
    );
    let cataloger = Arc::new(Cataloger::new(
        store,
        messenger,
        wizard,
        policy,
        CatalogingContext::from(&config),
        CardAuthor::from(&config.mirror),
    ));

    // Create app state
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, relay, cataloger));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
