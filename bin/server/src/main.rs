use std::sync::Arc;

use ebookdes_server::{
    app,
    auth::{AppState, HostedAuthClient},
    config::ServerConfig,
    db::{PgCatalogStore, ProfileRepository, RoleRepository},
    error::StartupError,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(report) = run().await {
        tracing::error!(?report, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> ebookdes_core::Result<(), StartupError> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::DatabaseConnect {
            details: e.to_string(),
        })?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| StartupError::Migrate {
            details: e.to_string(),
        })?;

    let provider =
        HostedAuthClient::new(config.auth.clone()).map_err(|e| StartupError::IdentityProvider {
            details: e.to_string(),
        })?;
    let store = PgCatalogStore::new(
        db_pool.clone(),
        config.database.authenticated_role.clone(),
    );
    store
        .can_assume_scoped_role()
        .await
        .map_err(|e| e.to_string())
        .and_then(|allowed| {
            if allowed {
                Ok(())
            } else {
                Err("connecting user is not a member of the role".to_string())
            }
        })
        .map_err(|details| StartupError::ScopedRole {
            role: config.database.authenticated_role.clone(),
            details,
        })?;

    // Create application state
    let app_state = Arc::new(AppState::new(
        config.auth.clone(),
        config.session.clone(),
        Arc::new(provider),
        Arc::new(store),
        Arc::new(RoleRepository::new(db_pool.clone())),
        Arc::new(ProfileRepository::new(db_pool)),
    ));

    let router = app::router(app_state, &config.public_dir);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.listen_addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
