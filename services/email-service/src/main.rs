use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::serve;
use foodx_database::{initialize_database, InMemoryDatabase, PgDatabase};
use foodx_email_service::{build_state, create_app};
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
    info!(environment = %config.environment, "Starting FoodX email service");

    let mail = Arc::new(TransactionalEmailService::from_config(&config.email)?);
    info!(transport = mail.transport_name(), sender = %mail.sender(), "Mail transport ready");

    let app = if config.database.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on shutdown");
        create_app(build_state(InMemoryDatabase::new(), mail), &config)
    } else {
        let pool = initialize_database(&config.database.to_database_config()).await?;
        info!("Database connection established");
        create_app(build_state(PgDatabase::new(pool), mail), &config)
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Email service listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}
