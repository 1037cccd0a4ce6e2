use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::serve;
use foodx_admin_api::{create_app, AppState, HealthProbes};
use foodx_database::{create_redis_pool, initialize_database, InMemoryDatabase, PgDatabase};
use foodx_mail::TransactionalEmailService;
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
    info!(environment = %config.environment, "Starting FoodX admin API");

    let mail = Arc::new(TransactionalEmailService::from_config(&config.email)?);
    info!(transport = mail.transport_name(), "Transactional email ready");

    let port = config.server.port;
    let app = if config.database.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on shutdown");
        create_app(AppState::new(InMemoryDatabase::new(), mail, config, HealthProbes::default()))
    } else {
        let pool = initialize_database(&config.database.to_database_config()).await?;
        info!("Database connection established");
        let redis = match create_redis_pool(&config.database.redis_url).await {
            Ok(redis) => Some(redis),
            Err(e) => {
                warn!(error = %e, "Redis unavailable; health checks will skip it");
                None
            }
        };
        let probes = HealthProbes {
            postgres: Some(pool.clone()),
            redis,
        };
        create_app(AppState::new(PgDatabase::new(pool), mail, config, probes))
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Admin API listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}
