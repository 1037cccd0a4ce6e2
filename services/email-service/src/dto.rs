//! Request and response bodies of the email API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use foodx_models::{Email, EmailAttachment, EmailDirection, EmailStatus, EmailThread};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    #[validate(email(message = "Recipient must be a valid email address"))]
    pub to: String,
    #[validate(email(message = "Sender must be a valid email address"))]
    pub from: Option<String>,
    #[validate(custom = "validate_addresses")]
    pub cc: Option<Vec<String>>,
    #[validate(custom = "validate_addresses")]
    pub bcc: Option<Vec<String>>,
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "Subject is required and must not exceed 500 characters"))]
    pub subject: String,
    pub html_body: Option<String>,
    pub plain_text_body: Option<String>,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub attachments: Option<Vec<AttachmentDto>>,
    /// Email this one answers; the new message joins its thread
    pub reply_to_email_id: Option<Uuid>,
    #[serde(default)]
    pub is_high_priority: bool,
}

fn validate_addresses(addresses: &[String]) -> Result<(), ValidationError> {
    if addresses.iter().all(|a| validator::validate_email(a.trim())) {
        Ok(())
    } else {
        let mut error = ValidationError::new("email");
        error.message = Some("Every copy recipient must be a valid email address".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDto {
    pub file_name: String,
    #[serde(default)]
    pub content_type: String,
    pub base64_content: String,
    #[serde(default)]
    pub is_inline: bool,
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub download_url: String,
    pub is_inline: bool,
}

impl From<&EmailAttachment> for AttachmentResponse {
    fn from(attachment: &EmailAttachment) -> Self {
        Self {
            id: attachment.id,
            file_name: attachment.file_name.clone(),
            content_type: attachment.content_type.clone(),
            file_size: attachment.file_size,
            download_url: format!("/api/email/attachment/{}", attachment.id),
            is_inline: attachment.is_inline,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailResponse {
    pub id: Uuid,
    pub message_id: Option<String>,
    pub thread_id: Option<Uuid>,
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub plain_text_body: Option<String>,
    pub direction: EmailDirection,
    pub status: EmailStatus,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub attachments: Vec<AttachmentResponse>,
}

impl EmailResponse {
    pub fn new(email: Email, attachments: &[EmailAttachment]) -> Self {
        Self {
            id: email.id,
            message_id: email.message_id,
            thread_id: email.thread_id,
            from: email.from_email,
            to: email.to_email,
            cc: email.cc_email,
            subject: email.subject,
            html_body: email.html_body,
            plain_text_body: email.plain_text_body,
            direction: email.direction,
            status: email.status,
            category: email.category,
            created_at: email.created_at,
            sent_at: email.sent_at,
            received_at: email.received_at,
            read_at: email.read_at,
            attachments: attachments.iter().map(AttachmentResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailThreadResponse {
    pub id: Uuid,
    pub subject: String,
    pub participants: Vec<String>,
    pub last_activity_at: DateTime<Utc>,
    pub email_count: i64,
    pub has_unread: bool,
    pub category: Option<String>,
    pub emails: Vec<EmailResponse>,
}

impl EmailThreadResponse {
    pub fn new(thread: EmailThread, emails: Vec<EmailResponse>) -> Self {
        Self {
            id: thread.id,
            subject: thread.subject,
            participants: thread.participant_emails,
            last_activity_at: thread.last_activity_at,
            email_count: thread.email_count,
            has_unread: thread.has_unread,
            category: thread.category,
            emails,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    pub email_id: Uuid,
    pub thread_id: Option<Uuid>,
    pub status: EmailStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Email> for SendResult {
    fn from(email: &Email) -> Self {
        let success = email.status == EmailStatus::Sent;
        Self {
            success,
            email_id: email.id,
            thread_id: email.thread_id,
            status: email.status,
            sent_at: email.sent_at,
            message: if success {
                "Email sent successfully".to_string()
            } else {
                "Email could not be delivered".to_string()
            },
            error: email.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: Uuid,
    pub to_email: String,
    pub status: EmailStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendResult {
    pub success: bool,
    pub total_sent: usize,
    pub total_failed: usize,
    pub emails: Vec<BulkItem>,
}

impl BulkSendResult {
    pub fn new(emails: &[Email]) -> Self {
        Self {
            success: true,
            total_sent: emails.iter().filter(|e| e.status == EmailStatus::Sent).count(),
            total_failed: emails.iter().filter(|e| e.status == EmailStatus::Failed).count(),
            emails: emails
                .iter()
                .map(|e| BulkItem {
                    id: e.id,
                    to_email: e.to_email.clone(),
                    status: e.status,
                    sent_at: e.sent_at,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub user_email: String,
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub category: Option<String>,
    pub search: Option<String>,
}

fn first_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxResponse {
    pub success: bool,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub emails: Vec<EmailResponse>,
}

/// A message posted by the provider's inbound parse webhook.
#[derive(Debug, Clone, Default)]
pub struct InboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub headers: Option<String>,
    pub spam_score: Option<String>,
    pub dkim: Option<String>,
    pub spf: Option<String>,
    pub attachments: Vec<InboundAttachment>,
}

#[derive(Debug, Clone)]
pub struct InboundAttachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// One entry of the provider's event webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryEvent {
    pub event: String,
    pub email: Option<String>,
    pub sg_message_id: Option<String>,
    /// Unix seconds
    pub timestamp: Option<i64>,
    pub reason: Option<String>,
    pub response: Option<String>,
}

impl DeliveryEvent {
    /// Provider message id as returned at send time; event ids carry a `.filter...` suffix.
    pub fn message_id(&self) -> Option<&str> {
        self.sg_message_id
            .as_deref()
            .map(|id| id.split('.').next().unwrap_or(id))
            .filter(|id| !id.is_empty())
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted_emails: usize,
    pub deleted_drafts: usize,
    pub deleted_threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let mut request = EmailRequest {
            to: "buyer@fresh.example".into(),
            subject: "Quote".into(),
            ..Default::default()
        };
        assert!(request.validate().is_ok());

        request.cc = Some(vec!["ok@fresh.example".into(), "not-an-address".into()]);
        assert!(request.validate().is_err());

        request.cc = None;
        request.subject.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_event_message_id_drops_filter_suffix() {
        let event: DeliveryEvent = serde_json::from_value(serde_json::json!({
            "event": "delivered",
            "sg_message_id": "sg-abc.filterdrecv-5645d9c87f-pq8k4-1-64B6E2A1-1.0",
            "timestamp": 1_700_000_000
        }))
        .unwrap();
        assert_eq!(event.message_id(), Some("sg-abc"));
        assert_eq!(event.occurred_at().map(|t| t.timestamp()), Some(1_700_000_000));
    }
}
