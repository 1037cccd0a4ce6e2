use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info};

use super::MailTransport;
use crate::error::{MailError, MailResult};
use crate::message::{Address, DeliveryReceipt, Envelope, OutboundEmail};

/// SendGrid v3 Web API client.
#[derive(Clone)]
pub struct SendGridTransport {
    client: Client,
    api_key: String,
    api_url: String,
}

impl SendGridTransport {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>, timeout: Duration) -> MailResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, email: &OutboundEmail) -> MailResult<DeliveryReceipt> {
        let payload = MailSendRequest::from_email(email)?;
        debug!(
            recipients = email.recipient_count(),
            personalizations = payload.personalizations.len(),
            "Posting mail to SendGrid"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED || status == StatusCode::OK {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            info!(status = status.as_u16(), message_id = ?message_id, "SendGrid accepted message");
            return Ok(DeliveryReceipt {
                transport: self.name().to_string(),
                message_id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "SendGrid rejected message");
        Err(MailError::Provider {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MailSendRequest {
    pub(crate) personalizations: Vec<Personalization>,
    from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<Content>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Personalization {
    pub(crate) to: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_template_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct Attachment {
    content: String,
    filename: String,
    #[serde(rename = "type")]
    content_type: String,
    disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<String>,
}

impl MailSendRequest {
    pub(crate) fn from_email(email: &OutboundEmail) -> MailResult<Self> {
        let from = email
            .from
            .clone()
            .ok_or_else(|| MailError::Message("sender address is missing".to_string()))?;
        if email.to.is_empty() {
            return Err(MailError::Message("at least one recipient is required".to_string()));
        }

        let personalizations = match email.envelope {
            Envelope::Shared => vec![Personalization {
                to: email.to.clone(),
                cc: email.cc.clone(),
                bcc: email.bcc.clone(),
                dynamic_template_data: email.template_data.clone(),
            }],
            Envelope::PerRecipient => email
                .to
                .iter()
                .map(|recipient| Personalization {
                    to: vec![recipient.clone()],
                    cc: Vec::new(),
                    bcc: Vec::new(),
                    dynamic_template_data: email.template_data.clone(),
                })
                .collect(),
        };

        // text/plain has to precede text/html
        let mut content = Vec::new();
        if let Some(text) = email.text_body.as_ref().filter(|t| !t.is_empty()) {
            content.push(Content {
                kind: "text/plain",
                value: text.clone(),
            });
        }
        if let Some(html) = email.html_body.as_ref().filter(|h| !h.is_empty()) {
            content.push(Content {
                kind: "text/html",
                value: html.clone(),
            });
        }

        let attachments = email
            .attachments
            .iter()
            .map(|a| Attachment {
                content: STANDARD.encode(&a.content),
                filename: a.filename.clone(),
                content_type: a.content_type.clone(),
                disposition: if a.inline { "inline" } else { "attachment" },
                content_id: a.content_id.clone(),
            })
            .collect();

        Ok(Self {
            personalizations,
            from,
            reply_to: email.reply_to.clone(),
            subject: (!email.subject.is_empty()).then(|| email.subject.clone()),
            content,
            headers: email.headers.clone(),
            attachments,
            template_id: email.template_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MailAttachment;

    fn sender() -> Address {
        Address::named("noreply@fdx.trading", "FoodX Platform")
    }

    #[test]
    fn test_bulk_payload_has_one_personalization_per_recipient() {
        let email = OutboundEmail::new("Price list")
            .sender(sender())
            .to("a@buyer.example")
            .to("b@buyer.example")
            .to("c@buyer.example")
            .html("<p>Prices</p>")
            .per_recipient();

        let payload = serde_json::to_value(MailSendRequest::from_email(&email).unwrap()).unwrap();
        let personalizations = payload["personalizations"].as_array().unwrap();
        assert_eq!(personalizations.len(), 3);
        assert_eq!(personalizations[1]["to"][0]["email"], "b@buyer.example");
        assert!(personalizations[1].get("cc").is_none());
    }

    #[test]
    fn test_payload_content_headers_and_attachments() {
        let email = OutboundEmail::new("Spec sheet")
            .sender(sender())
            .to("buyer@fresh.example")
            .html("<p>See attached</p>")
            .text("See attached")
            .header("X-FoodX-Category", "rfq")
            .attachment(MailAttachment {
                filename: "spec.txt".into(),
                content_type: "text/plain".into(),
                content: b"quinoa".to_vec(),
                inline: false,
                content_id: None,
            });

        let payload = serde_json::to_value(MailSendRequest::from_email(&email).unwrap()).unwrap();
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][1]["type"], "text/html");
        assert_eq!(payload["headers"]["X-FoodX-Category"], "rfq");
        assert_eq!(payload["attachments"][0]["content"], STANDARD.encode("quinoa"));
        assert_eq!(payload["attachments"][0]["disposition"], "attachment");
        assert_eq!(payload["from"]["name"], "FoodX Platform");
    }

    #[test]
    fn test_template_payload_carries_dynamic_data() {
        let email = OutboundEmail::new("")
            .sender(sender())
            .to("buyer@fresh.example")
            .template("d-123", serde_json::json!({ "first_name": "Dana" }));

        let payload = serde_json::to_value(MailSendRequest::from_email(&email).unwrap()).unwrap();
        assert_eq!(payload["template_id"], "d-123");
        assert_eq!(payload["personalizations"][0]["dynamic_template_data"]["first_name"], "Dana");
        assert!(payload.get("subject").is_none());
        assert!(payload.get("content").is_none());
    }

    #[test]
    fn test_missing_sender_or_recipients_is_rejected() {
        let no_sender = OutboundEmail::new("x").to("a@b.example");
        assert!(matches!(MailSendRequest::from_email(&no_sender), Err(MailError::Message(_))));

        let no_recipients = OutboundEmail::new("x").sender(sender());
        assert!(matches!(MailSendRequest::from_email(&no_recipients), Err(MailError::Message(_))));
    }
}
