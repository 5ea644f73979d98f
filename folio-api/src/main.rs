//! # Folio API Server
//!
//! JSON API for the Folio article service: hierarchical articles grouped by
//! category, edited by users signed in through the identity provider.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p folio-api
//! ```

use folio_api::{
    app::{build_router, AppState},
    config::Config,
};
use folio_shared::{
    auth::supabase::{SupabaseConfig, SupabaseProvider},
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, get_pool_stats, DatabaseConfig},
        postgres::PgStore,
    },
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Timeout for calls to the identity provider
const PROVIDER_TIMEOUT_SECONDS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_api=debug,folio_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Folio API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    let stats = get_pool_stats(&pool);
    tracing::info!(
        total = stats.total_connections,
        idle = stats.idle_connections,
        "Database pool connected"
    );

    run_migrations(&pool).await?;

    let provider = SupabaseProvider::new(SupabaseConfig {
        url: config.auth.supabase_url.clone(),
        anon_key: config.auth.anon_key.clone(),
        jwt_secret: config.auth.jwt_secret.clone(),
        request_timeout_seconds: PROVIDER_TIMEOUT_SECONDS,
    })?;

    let bind_address = config.bind_address();
    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(provider),
        config,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database pool");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
