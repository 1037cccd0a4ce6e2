use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::serve;
use foodx_database::{build_cache, initialize_database, InMemoryDatabase, PgDatabase};
use foodx_product_workflow::{build_state, create_app};
use foodx_utils::{init_logging, AppConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!(environment = %config.environment, "Starting FoodX product workflow service");

    let cache = build_cache(
        &config.cache.backend,
        &config.database.redis_url,
        Duration::from_secs(config.cache.default_ttl_seconds),
    )
    .await;

    let app = if config.database.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on shutdown");
        create_app(build_state(InMemoryDatabase::new(), cache, &config), &config)
    } else {
        let pool = initialize_database(&config.database.to_database_config()).await?;
        info!("Database connection established");
        create_app(build_state(PgDatabase::new(pool), cache, &config), &config)
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Product workflow service listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}
