use std::time::Duration;

use foodx_mail::{MailError, MailTransport, OutboundEmail, SendGridTransport, TransactionalEmailService};
use foodx_utils::EmailConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> EmailConfig {
    let mut config = EmailConfig::default();
    config.sendgrid.api_key = "SG.test-key".to_string();
    config.sendgrid.api_url = server.uri();
    config
}

#[tokio::test]
async fn test_accepted_message_returns_provider_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.test-key"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-abc"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = SendGridTransport::new("SG.test-key", server.uri(), Duration::from_secs(5)).unwrap();
    let email = OutboundEmail::new("RFQ-2026-001")
        .sender("noreply@fdx.trading".into())
        .to("supplier@andes.example")
        .html("<p>New RFQ</p>");

    let receipt = transport.send(&email).await.unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("sg-abc"));
    assert_eq!(receipt.transport, "sendgrid");
}

#[tokio::test]
async fn test_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"errors":[{"message":"bad from"}]}"#))
        .mount(&server)
        .await;

    let service = TransactionalEmailService::from_config(&config_for(&server)).unwrap();
    let err = service
        .deliver(OutboundEmail::new("x").to("buyer@fresh.example").html("<p>x</p>"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::Provider { status: 400, .. }));
    assert_eq!(err.to_string(), r#"SendGrid Error: 400 - {"errors":[{"message":"bad from"}]}"#);
}

#[tokio::test]
async fn test_send_helpers_report_false_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = TransactionalEmailService::from_config(&config_for(&server)).unwrap();
    assert_eq!(service.transport_name(), "sendgrid");
    assert!(!service.send_email("buyer@fresh.example", "Hi", "<p>Hi</p>", None).await);
    assert!(!service.send_invitation("buyer@fresh.example", "https://fdx.trading/join", "Ops").await);
}

#[tokio::test]
async fn test_bulk_send_is_one_request_with_a_personalization_each() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let service = TransactionalEmailService::from_config(&config_for(&server)).unwrap();
    let recipients: Vec<String> = (1..=3).map(|i| format!("buyer{}@fresh.example", i)).collect();
    assert!(service.send_bulk_email(&recipients, "Harvest update", "<p>Quinoa is in</p>").await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let personalizations = body["personalizations"].as_array().unwrap();
    assert_eq!(personalizations.len(), 3);
    assert_eq!(personalizations[2]["to"][0]["email"], "buyer3@fresh.example");
    assert_eq!(body["from"]["email"], "noreply@fdx.trading");
    assert_eq!(body["from"]["name"], "FoodX Platform");
}

#[tokio::test]
async fn test_empty_api_key_writes_to_sandbox() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = dir.path().join("mail").join("sandbox.jsonl");
    let config = EmailConfig {
        sandbox_path: sandbox.to_string_lossy().into_owned(),
        ..EmailConfig::default()
    };

    let service = TransactionalEmailService::from_config(&config).unwrap();
    assert_eq!(service.transport_name(), "sandbox");
    assert!(
        service
            .send_magic_link("Buyer@Fresh.example", "https://fdx.trading/auth/verify?token=abc123")
            .await
    );

    let contents = std::fs::read_to_string(&sandbox).unwrap();
    let record: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(record["subject"], "Your FoodX Sign-In Link");
    assert_eq!(record["links"][0], "https://fdx.trading/auth/verify?token=abc123");
    assert_eq!(record["to"][0]["email"], "Buyer@Fresh.example");
}
