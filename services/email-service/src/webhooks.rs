//! Provider webhooks. Both endpoints answer 200 whatever happens so the provider does not
//! retry; problems are logged.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
};
use foodx_database::UnitOfWorkFactory;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dto::{DeliveryEvent, InboundAttachment, InboundEmail};
use crate::routes::AppState;

pub async fn sendgrid_inbound<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> StatusCode {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!(error = %e, "Inbound webhook without a multipart body");
            return StatusCode::OK;
        }
    };

    match parse_inbound(&mut multipart).await {
        Ok(inbound) => {
            if let Err(e) = state.emails.receive(inbound).await {
                error!(error = %e, "Failed to store inbound email");
            }
        }
        Err(e) => warn!(error = %e, "Failed to read inbound webhook form"),
    }
    StatusCode::OK
}

pub async fn email_events<F: UnitOfWorkFactory>(State(state): State<AppState<F>>, body: Bytes) -> StatusCode {
    let events = parse_events(&body);
    if events.is_empty() {
        return StatusCode::OK;
    }

    match state.emails.apply_events(&events).await {
        Ok(applied) => info!(received = events.len(), applied, "Delivery events processed"),
        Err(e) => error!(error = %e, "Failed to apply delivery events"),
    }
    StatusCode::OK
}

async fn parse_inbound(multipart: &mut Multipart) -> Result<InboundEmail, MultipartError> {
    let mut inbound = InboundEmail::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_ascii_lowercase();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let content = field.bytes().await?.to_vec();
            inbound.attachments.push(InboundAttachment {
                file_name,
                content_type,
                content,
            });
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "from" => inbound.from = value,
            "to" => inbound.to = value,
            "subject" => inbound.subject = value,
            "html" => inbound.html = Some(value),
            "text" => inbound.text = Some(value),
            "headers" => inbound.headers = Some(value),
            "spam_score" => inbound.spam_score = Some(value),
            "dkim" => inbound.dkim = Some(value),
            "spf" => inbound.spf = Some(value),
            _ => {}
        }
    }

    Ok(inbound)
}

/// A JSON array of events, or a single event object. Entries that do not parse are dropped.
pub fn parse_events(body: &[u8]) -> Vec<DeliveryEvent> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Delivery event payload is not JSON");
            return Vec::new();
        }
    };

    let entries = match value {
        Value::Array(entries) => entries,
        single @ Value::Object(_) => vec![single],
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}
