//! Delivery through a mocked SendGrid API, then the delivery event webhook.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use foodx_database::{InMemoryDatabase, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_email_service::metrics::{message_count, MessageOutcome};
use foodx_email_service::{build_state, create_app};
use foodx_mail::{Address, SendGridTransport, TransactionalEmailService};
use foodx_models::EmailStatus;
use foodx_utils::AppConfig;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(server: &MockServer, db: &InMemoryDatabase) -> Router {
    let transport = SendGridTransport::new("SG.test-key", server.uri(), Duration::from_secs(5)).unwrap();
    let mail = TransactionalEmailService::new(
        Arc::new(transport),
        Address::named("noreply@fdx.trading", "FoodX Platform"),
    );
    create_app(build_state(db.clone(), Arc::new(mail)), &AppConfig::default())
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn email_id(body: &Value) -> Uuid {
    serde_json::from_value(body["email_id"].clone()).unwrap()
}

#[tokio::test]
async fn test_accepted_message_is_tracked_through_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.test-key"))
        .respond_with(ResponseTemplate::new(202).insert_header("x-message-id", "sg-msg-1"))
        .expect(1)
        .mount(&server)
        .await;

    let db = InMemoryDatabase::new();
    let app = app(&server, &db);
    let (status, body) = post(
        &app,
        "/api/email/send",
        json!({"to": "buyer@fresh.example", "subject": "RFQ-2026-001 issued", "html_body": "<p>Hi</p>"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = email_id(&body);
    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Sent);
    assert_eq!(stored.message_id.as_deref(), Some("sg-msg-1"));
    assert_eq!(stored.provider.as_deref(), Some("sendgrid"));

    let events = json!([
        {"event": "processed", "sg_message_id": "sg-msg-1.filter0001", "timestamp": 1_700_000_000},
        {"event": "delivered", "sg_message_id": "sg-msg-1.filter0001", "timestamp": 1_700_000_100}
    ]);
    let (status, _) = post(&app, "/api/webhook/email-events", events).await;
    assert_eq!(status, StatusCode::OK);
    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Delivered);

    let open = json!({"event": "open", "sg_message_id": "sg-msg-1.filter0001", "timestamp": 1_700_000_200});
    post(&app, "/api/webhook/email-events", open).await;
    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Read);
    assert_eq!(stored.read_at.map(|t| t.timestamp()), Some(1_700_000_200));
}

#[tokio::test]
async fn test_rejected_message_is_stored_as_failed_and_can_be_resent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid from address"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("x-message-id", "sg-msg-2"))
        .mount(&server)
        .await;

    let db = InMemoryDatabase::new();
    let app = app(&server, &db);
    let failures_before = message_count(MessageOutcome::Failed);

    let (status, body) = post(
        &app,
        "/api/email/send",
        json!({"to": "buyer@fresh.example", "subject": "Samples"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["error"], "SendGrid Error: 400 - invalid from address");
    assert!(message_count(MessageOutcome::Failed) > failures_before);

    let id = email_id(&body);
    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Failed);
    assert!(stored.failed_at.is_some());

    let (status, body) = post(&app, &format!("/api/email/resend/{}", id), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(email_id(&body), id);

    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Sent);
    assert_eq!(stored.message_id.as_deref(), Some("sg-msg-2"));
    assert!(stored.error_message.is_none());

    let bounce = json!([{"event": "bounce", "sg_message_id": "sg-msg-2.filter9", "reason": "550 5.1.1 unknown user"}]);
    post(&app, "/api/webhook/email-events", bounce).await;
    let stored = db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EmailStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("550 5.1.1 unknown user"));
}
