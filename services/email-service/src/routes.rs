use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use foodx_database::{Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::Email;
use foodx_utils::FoodxResult;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::dto::{
    BulkSendResult, CleanupReport, EmailRequest, EmailThreadResponse, InboxParams, InboxResponse, SendResult,
};
use crate::sending::EmailService;
use crate::webhooks;

pub struct AppState<F: UnitOfWorkFactory> {
    pub factory: F,
    pub emails: Arc<EmailService<F>>,
}

impl<F: UnitOfWorkFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            emails: self.emails.clone(),
        }
    }
}

pub fn create_api_routes<F: UnitOfWorkFactory>() -> Router<AppState<F>> {
    Router::new()
        // Sending
        .route("/email/send", post(send_email::<F>))
        .route("/email/send-bulk", post(send_bulk::<F>))
        .route("/email/reply/:id", post(reply::<F>))
        .route("/email/resend/:id", post(resend::<F>))
        // Reading
        .route("/email/inbox", get(inbox::<F>))
        .route("/email/thread/:id", get(thread::<F>))
        .route("/email/attachment/:id", get(attachment::<F>))
        // Filing
        .route("/email/mark-read/:id", put(mark_read::<F>))
        .route("/email/archive/:id", put(archive::<F>))
        .route("/email/delete/:id", delete(soft_delete::<F>))
        .route("/email/restore/:id", put(restore::<F>))
        .route("/email/permanent/:id", delete(delete_permanently::<F>))
        .route("/email/cleanup", post(cleanup::<F>))
        // Provider webhooks
        .route("/webhook/sendgrid/inbound", post(webhooks::sendgrid_inbound::<F>))
        .route("/webhook/email-events", post(webhooks::email_events::<F>))
}

/// 200 when the provider accepted the message, 502 when the stored email ended up failed.
fn send_response(email: &Email) -> (StatusCode, Json<SendResult>) {
    let result = SendResult::from(email);
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(result))
}

async fn send_email<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(request): Json<EmailRequest>,
) -> FoodxResult<(StatusCode, Json<SendResult>)> {
    let email = state.emails.send(request).await?;
    Ok(send_response(&email))
}

async fn send_bulk<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(requests): Json<Vec<EmailRequest>>,
) -> FoodxResult<Json<BulkSendResult>> {
    let emails = state.emails.send_bulk(requests).await?;
    Ok(Json(BulkSendResult::new(&emails)))
}

async fn reply<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    Json(request): Json<EmailRequest>,
) -> FoodxResult<(StatusCode, Json<SendResult>)> {
    let email = state.emails.reply(id, request).await?;
    Ok(send_response(&email))
}

async fn resend<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<(StatusCode, Json<SendResult>)> {
    let email = state.emails.resend(id).await?;
    Ok(send_response(&email))
}

async fn inbox<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(params): Query<InboxParams>,
) -> FoodxResult<Json<InboxResponse>> {
    Ok(Json(state.emails.inbox(params).await?))
}

async fn thread<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<EmailThreadResponse>> {
    Ok(Json(state.emails.thread(id).await?))
}

async fn attachment<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Response> {
    let attachment = state.emails.attachment(id).await?;
    let disposition = format!("attachment; filename=\"{}\"", attachment.file_name.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.content.unwrap_or_default(),
    )
        .into_response())
}

fn filed(email: &Email) -> Json<Value> {
    Json(json!({
        "success": true,
        "id": email.id,
        "status": email.status,
        "is_archived": email.is_archived,
        "is_deleted": email.is_deleted,
    }))
}

async fn mark_read<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Value>> {
    Ok(filed(&state.emails.mark_read(id).await?))
}

async fn archive<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Value>> {
    Ok(filed(&state.emails.archive(id).await?))
}

async fn soft_delete<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Value>> {
    Ok(filed(&state.emails.soft_delete(id).await?))
}

async fn restore<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Value>> {
    Ok(filed(&state.emails.restore(id).await?))
}

async fn delete_permanently<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<StatusCode> {
    state.emails.delete_permanently(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cleanup<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> FoodxResult<Json<CleanupReport>> {
    Ok(Json(state.emails.cleanup(Utc::now()).await?))
}

pub async fn health_check<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> (StatusCode, Json<Value>) {
    let store = match state.factory.unit_of_work().emails().count(None).await {
        Ok(count) => json!({"status": "healthy", "emails": count}),
        Err(e) => json!({"status": "unhealthy", "error": e.to_string()}),
    };
    let healthy = store["status"] == "healthy";

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "service": "email-service",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "transport": state.emails.mail().transport_name(),
        "checks": { "store": store },
    });
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
