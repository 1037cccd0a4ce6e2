use axum::{extract::State, response::Json};
use foodx_database::{postgres_health_check, redis_health_check, Repository, UnitOfWork, UnitOfWorkFactory};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "foodx-admin-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Probes the store plus Postgres and Redis when connected; any failure reports "degraded".
pub async fn detailed_health_check<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "service": "foodx-admin-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "email_transport": state.mail.transport_name(),
        "checks": {}
    });

    let store_status = match state.factory.unit_of_work().products().count(None).await {
        Ok(products) => json!({"status": "healthy", "message": format!("{} products", products)}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    health_status["checks"]["store"] = store_status;

    if let Some(pool) = &state.probes.postgres {
        let postgres_status = match postgres_health_check(pool).await {
            Ok(_) => json!({"status": "healthy", "message": "Connected"}),
            Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
        };
        health_status["checks"]["postgres"] = postgres_status;
    }

    if let Some(pool) = &state.probes.redis {
        let redis_status = match redis_health_check(pool).await {
            Ok(_) => json!({"status": "healthy", "message": "Connected"}),
            Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
        };
        health_status["checks"]["redis"] = redis_status;
    }

    let all_healthy = health_status["checks"]
        .as_object()
        .map(|checks| checks.values().all(|check| check["status"] == "healthy"))
        .unwrap_or(true);

    if !all_healthy {
        health_status["status"] = json!("degraded");
    }

    Json(health_status)
}
