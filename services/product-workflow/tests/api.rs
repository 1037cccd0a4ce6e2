use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use foodx_database::{InMemoryDatabase, MemoryCache};
use foodx_product_workflow::{build_state, create_app};
use foodx_utils::AppConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::default();
    let state = build_state(InMemoryDatabase::new(), Arc::new(MemoryCache::new()), &config);
    create_app(state, &config)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_brief(body: &Value, idempotency_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/product-briefs")
        .header("content-type", "application/json")
        .header("x-user-id", "buyer-1");
    if let Some(key) = idempotency_key {
        builder = builder.header("idempotency-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn quinoa() -> Value {
    json!({
        "product_name": "Organic Quinoa",
        "category": "Grains",
        "is_kosher_certified": true,
        "kosher_organization": "OU"
    })
}

#[tokio::test]
async fn test_create_brief_returns_the_generated_records() {
    let app = app();
    let (status, body) = send(&app, post_brief(&quinoa(), None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["replayed"], false);
    assert_eq!(body["product_brief"]["status"], "Active");
    assert_eq!(body["product_brief"]["created_by"], "buyer-1");
    assert_eq!(body["rfq"]["product_brief_id"], body["product_brief"]["id"]);
    assert_eq!(body["project"]["rfq_id"], body["rfq"]["id"]);

    let id = body["product_brief"]["id"].as_str().unwrap().to_string();
    let (status, workflow) = send(&app, get(&format!("/api/product-briefs/{}/workflow", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workflow["rfq"]["id"], body["rfq"]["id"]);
    assert_eq!(workflow["project"]["id"], body["project"]["id"]);

    let (status, rfqs) = send(&app, get("/api/rfqs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rfqs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_idempotency_key_replays_with_ok() {
    let app = app();
    let (first_status, first) = send(&app, post_brief(&quinoa(), Some("checkout-7"))).await;
    let (second_status, second) = send(&app, post_brief(&quinoa(), Some("checkout-7"))).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["product_brief"]["id"], first["product_brief"]["id"]);

    let (_, briefs) = send(&app, get("/api/product-briefs")).await;
    assert_eq!(briefs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_validation_and_lookup_errors() {
    let app = app();
    let invalid = json!({"product_name": "Organic Quinoa", "category": "Grains", "is_kosher_certified": true});
    let (status, body) = send(&app, post_brief(&invalid, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, get("/api/product-briefs?status=archived")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get(&format!("/api/product-briefs/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_filters_and_delete_cascade() {
    let app = app();
    let (_, created) = send(&app, post_brief(&quinoa(), None)).await;
    let id = created["product_brief"]["id"].as_str().unwrap().to_string();

    let (_, active) = send(&app, get("/api/product-briefs?status=active")).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    let (_, drafts) = send(&app, get("/api/product-briefs?status=Draft")).await;
    assert!(drafts.as_array().unwrap().is_empty());
    let (_, mine) = send(&app, get("/api/product-briefs?created_by=buyer-1")).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let request = Request::delete(format!("/api/product-briefs/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, rfqs) = send(&app, get("/api/rfqs")).await;
    assert!(rfqs.as_array().unwrap().is_empty());
    let (_, projects) = send(&app, get("/api/projects")).await;
    assert!(projects.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_and_lookups() {
    let app = app();
    let (status, health) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["checks"]["store"]["status"], "healthy");

    let (_, categories) = send(&app, get("/api/lookups/categories")).await;
    assert!(categories
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == "Grains & Pasta"));
    let (_, countries) = send(&app, get("/api/lookups/countries")).await;
    assert!(!countries.as_array().unwrap().is_empty());
}
