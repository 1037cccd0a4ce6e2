use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use foodx_database::{InMemoryDatabase, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_email_service::{build_state, create_app};
use foodx_mail::{Address, SandboxTransport, TransactionalEmailService};
use foodx_models::{Email, EmailStatus};
use foodx_utils::AppConfig;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    app: Router,
    db: InMemoryDatabase,
    sandbox: PathBuf,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let sandbox = dir.path().join("mail.jsonl");
    let mail = TransactionalEmailService::new(
        Arc::new(SandboxTransport::new(sandbox.clone())),
        Address::named("noreply@fdx.trading", "FoodX Platform"),
    );
    let db = InMemoryDatabase::new();
    let app = create_app(build_state(db.clone(), Arc::new(mail)), &AppConfig::default());
    Harness {
        app,
        db,
        sandbox,
        _dir: dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "foodx-test-boundary";

fn inbound_request(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, content)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"attachment1\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/api/webhook/sendgrid/inbound")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_send_stores_and_writes_sandbox_record() {
    let h = harness();
    let request = json!({
        "to": "Buyer@Fresh.example",
        "subject": "Quinoa samples",
        "html_body": "<p>Samples ship Monday. <a href=\"https://fdx.trading/rfq/1\">RFQ</a></p>",
        "category": "Samples",
        "cc": ["qa@fresh.example"],
        "attachments": [{"file_name": "coa.pdf", "base64_content": "JVBERi0xLjQ="}]
    });
    let (status, body) = send(&h.app, json_request("POST", "/api/email/send", &request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "Sent");

    let id: uuid::Uuid = serde_json::from_value(body["email_id"].clone()).unwrap();
    let stored = h.db.unit_of_work().emails().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.to_email, "buyer@fresh.example");
    assert_eq!(stored.from_email, "noreply@fdx.trading");
    assert_eq!(stored.cc_email.as_deref(), Some("qa@fresh.example"));
    assert_eq!(stored.provider.as_deref(), Some("sandbox"));
    assert!(stored.message_id.as_deref().unwrap().starts_with("sandbox-"));
    assert!(stored.sent_at.is_some());
    assert_eq!(h.db.unit_of_work().email_attachments().count(None).await.unwrap(), 1);

    let log = std::fs::read_to_string(&h.sandbox).unwrap();
    let record: Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(record["headers"]["X-FoodX-EmailId"], id.to_string());
    assert_eq!(record["headers"]["X-FoodX-Category"], "Samples");
    assert_eq!(record["links"][0], "https://fdx.trading/rfq/1");
    assert_eq!(record["attachments"][0], "coa.pdf");
}

#[tokio::test]
async fn test_send_rejects_invalid_requests() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        json_request("POST", "/api/email/send", &json!({"to": "not-an-address", "subject": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let bad_file = json!({
        "to": "buyer@fresh.example",
        "subject": "Hi",
        "attachments": [{"file_name": "x.pdf", "base64_content": "%%%"}]
    });
    let (status, _) = send(&h.app, json_request("POST", "/api/email/send", &bad_file)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.db.unit_of_work().emails().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_send_reports_each_message() {
    let h = harness();
    let requests = json!([
        {"to": "a@fresh.example", "subject": "Price list"},
        {"to": "b@fresh.example", "subject": "Price list"}
    ]);
    let (status, body) = send(&h.app, json_request("POST", "/api/email/send-bulk", &requests)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sent"], 2);
    assert_eq!(body["total_failed"], 0);
    assert_eq!(body["emails"][1]["to_email"], "b@fresh.example");
}

#[tokio::test]
async fn test_bulk_send_with_an_invalid_item_sends_nothing() {
    let h = harness();
    let requests = json!([
        {"to": "a@fresh.example", "subject": "Price list"},
        {"to": "not-an-email", "subject": "Price list"}
    ]);
    let (status, body) = send(&h.app, json_request("POST", "/api/email/send-bulk", &requests)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(h.db.unit_of_work().emails().count(None).await.unwrap(), 0);
    let log = std::fs::read_to_string(&h.sandbox).unwrap_or_default();
    assert_eq!(log.lines().count(), 0);
}

#[tokio::test]
async fn test_inbound_threading_and_reply() {
    let h = harness();
    let fields = [
        ("from", "Jane Grower <Jane@Farm.example>"),
        ("to", "buyer@fdx.trading, other@fdx.trading"),
        ("subject", "Quinoa pricing"),
        ("text", "Our price is 2.10/kg"),
        ("headers", "Message-ID: <m1@farm.example>\nSubject: Quinoa pricing"),
        ("spam_score", "0.1"),
    ];
    let (status, _) = send(&h.app, inbound_request(&fields, Some(("price.csv", "text/csv", b"sku,price\nQN,2.10")))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, inbox) = send(&h.app, empty("GET", "/api/email/inbox?user_email=buyer@fdx.trading")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["total_count"], 1);
    let first = &inbox["emails"][0];
    assert_eq!(first["from"], "jane@farm.example");
    assert_eq!(first["status"], "Received");
    assert_eq!(first["message_id"], "m1@farm.example");
    let attachment_url = first["attachments"][0]["download_url"].as_str().unwrap().to_string();
    let thread_id = first["thread_id"].as_str().unwrap().to_string();

    let (status, _) = send(&h.app, empty("GET", &attachment_url)).await;
    assert_eq!(status, StatusCode::OK);

    // A follow-up with a prefixed subject lands in the same thread.
    let follow_up = [
        ("from", "jane@farm.example"),
        ("to", "buyer@fdx.trading"),
        ("subject", "RE: Quinoa pricing"),
        ("text", "Any update?"),
    ];
    send(&h.app, inbound_request(&follow_up, None)).await;

    let email_id = first["id"].as_str().unwrap().to_string();
    let (status, reply) = send(
        &h.app,
        json_request("POST", &format!("/api/email/reply/{}", email_id), &json!({"plain_text_body": "Accepted"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["thread_id"].as_str(), Some(thread_id.as_str()));

    let (status, thread) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["email_count"], 3);
    assert_eq!(thread["has_unread"], true);
    let emails = thread["emails"].as_array().unwrap();
    assert_eq!(emails.len(), 3);
    assert_eq!(emails[2]["subject"], "RE: Quinoa pricing");
    assert_eq!(emails[2]["from"], "buyer@fdx.trading");
    assert_eq!(emails[2]["to"], "jane@farm.example");

    for email in &emails[..2] {
        let uri = format!("/api/email/mark-read/{}", email["id"].as_str().unwrap());
        let (status, body) = send(&h.app, empty("PUT", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Read");
    }
    let (_, thread) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(thread["has_unread"], false);
}

#[tokio::test]
async fn test_webhooks_always_answer_ok() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        Request::post("/api/webhook/sendgrid/inbound")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &h.app,
        Request::post("/api/webhook/email-events").body(Body::from("garbage")).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = json!([{"event": "delivered", "sg_message_id": "unknown.filter", "timestamp": 1_700_000_000}]);
    let (status, _) = send(&h.app, json_request("POST", "/api/webhook/email-events", &events)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_archive_delete_restore_and_permanent_delete() {
    let h = harness();
    send(&h.app, inbound_request(&[("from", "a@farm.example"), ("to", "buyer@fdx.trading"), ("subject", "Dates")], None)).await;
    let (_, inbox) = send(&h.app, empty("GET", "/api/email/inbox?user_email=buyer@fdx.trading")).await;
    let id = inbox["emails"][0]["id"].as_str().unwrap().to_string();
    let thread_id = inbox["emails"][0]["thread_id"].as_str().unwrap().to_string();

    let (_, thread) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(thread["has_unread"], true);

    let (_, archived) = send(&h.app, empty("PUT", &format!("/api/email/archive/{}", id))).await;
    assert_eq!(archived["is_archived"], true);
    let (_, thread) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(thread["has_unread"], false);
    let (_, inbox) = send(&h.app, empty("GET", "/api/email/inbox?user_email=buyer@fdx.trading")).await;
    assert_eq!(inbox["total_count"], 0);

    let (_, deleted) = send(&h.app, empty("DELETE", &format!("/api/email/delete/{}", id))).await;
    assert_eq!(deleted["is_deleted"], true);

    let (_, restored) = send(&h.app, empty("PUT", &format!("/api/email/restore/{}", id))).await;
    assert_eq!(restored["is_deleted"], false);
    assert_eq!(restored["is_archived"], false);
    let (_, thread) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(thread["has_unread"], true);
    let (_, inbox) = send(&h.app, empty("GET", "/api/email/inbox?user_email=buyer@fdx.trading")).await;
    assert_eq!(inbox["total_count"], 1);

    let (status, _) = send(&h.app, empty("DELETE", &format!("/api/email/permanent/{}", id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&h.app, empty("GET", &format!("/api/email/thread/{}", thread_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&h.app, empty("PUT", &format!("/api/email/archive/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inbox_requires_user_and_resend_requires_failed_email() {
    let h = harness();
    let (status, _) = send(&h.app, empty("GET", "/api/email/inbox")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, sent) = send(
        &h.app,
        json_request("POST", "/api/email/send", &json!({"to": "b@fresh.example", "subject": "Hi"})),
    )
    .await;
    let (status, _) = send(&h.app, empty("POST", &format!("/api/email/resend/{}", sent["email_id"].as_str().unwrap()))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&h.app, empty("POST", &format!("/api/email/resend/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_purges_old_trash_drafts_and_empty_threads() {
    let h = harness();
    let now = Utc::now();
    {
        let uow = h.db.unit_of_work();
        let mut trashed = Email::inbound("a@farm.example", "buyer@fdx.trading", "Old", now - Duration::days(40));
        trashed.is_deleted = true;
        trashed.deleted_at = Some(now - Duration::days(31));
        uow.emails().add(trashed).await.unwrap();

        let mut recent_trash = Email::inbound("a@farm.example", "buyer@fdx.trading", "Recent", now);
        recent_trash.is_deleted = true;
        recent_trash.deleted_at = Some(now - Duration::days(2));
        uow.emails().add(recent_trash).await.unwrap();

        let mut draft = Email::outbound("buyer@fdx.trading", "a@farm.example", "Draft", now - Duration::days(8));
        draft.status = EmailStatus::Draft;
        uow.emails().add(draft).await.unwrap();

        uow.email_threads()
            .add(foodx_models::EmailThread::new("Orphan", &["a@farm.example"], now))
            .await
            .unwrap();
    }

    let (status, report) = send(&h.app, empty("POST", "/api/email/cleanup")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({"deleted_emails": 1, "deleted_drafts": 1, "deleted_threads": 1}));
    assert_eq!(h.db.unit_of_work().emails().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, body) = send(&h.app, empty("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transport"], "sandbox");
    assert_eq!(body["checks"]["store"]["status"], "healthy");
}
