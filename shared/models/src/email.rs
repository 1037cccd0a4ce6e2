//! Email communication models.
//!
//! Outbound mail is stored before it is handed to the delivery provider so that failures
//! stay visible. Inbound mail arrives through provider webhooks and is grouped into
//! threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailDirection {
    Inbound,
    Outbound,
}

impl EmailDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmailStatus {
    Draft,
    #[default]
    Pending,
    Sent,
    Delivered,
    Failed,
    Received,
    Read,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Sent => "Sent",
            Self::Delivered => "Delivered",
            Self::Failed => "Failed",
            Self::Received => "Received",
            Self::Read => "Read",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            "received" => Some(Self::Received),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailFolder {
    #[default]
    Inbox,
    Sent,
    Drafts,
}

impl EmailFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Drafts => "drafts",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "sent" => Some(Self::Sent),
            "drafts" | "draft" => Some(Self::Drafts),
            _ => None,
        }
    }
}

/// A persisted email message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Email {
    pub id: Uuid,
    /// Id assigned by the delivery provider
    pub message_id: Option<String>,
    pub thread_id: Option<Uuid>,
    pub from_email: String,
    pub to_email: String,
    pub cc_email: Option<String>,
    pub bcc_email: Option<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub plain_text_body: Option<String>,
    pub direction: EmailDirection,
    pub status: EmailStatus,
    pub provider: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub category: Option<String>,
    /// Free-form JSON document
    pub metadata: Option<String>,
    pub folder: EmailFolder,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Email {
    /// A blank outbound message in the pending state.
    pub fn outbound(from: impl Into<String>, to: impl Into<String>, subject: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id: None,
            thread_id: None,
            from_email: from.into(),
            to_email: to.into(),
            cc_email: None,
            bcc_email: None,
            subject: subject.into(),
            html_body: None,
            plain_text_body: None,
            direction: EmailDirection::Outbound,
            status: EmailStatus::Pending,
            provider: None,
            supplier_id: None,
            buyer_id: None,
            user_id: None,
            category: None,
            metadata: None,
            folder: EmailFolder::Sent,
            is_archived: false,
            archived_at: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            sent_at: None,
            received_at: None,
            read_at: None,
            failed_at: None,
            error_message: None,
        }
    }

    /// A received message as stored on arrival.
    pub fn inbound(from: impl Into<String>, to: impl Into<String>, subject: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            direction: EmailDirection::Inbound,
            status: EmailStatus::Received,
            folder: EmailFolder::Inbox,
            received_at: Some(now),
            ..Self::outbound(from, to, subject, now)
        }
    }

    pub fn is_unread(&self) -> bool {
        self.direction == EmailDirection::Inbound && self.read_at.is_none()
    }

    pub fn mark_sent(&mut self, message_id: Option<String>, now: DateTime<Utc>) {
        self.status = EmailStatus::Sent;
        self.sent_at = Some(now);
        self.message_id = message_id;
        self.failed_at = None;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = EmailStatus::Failed;
        self.failed_at = Some(now);
        self.error_message = Some(error.into());
    }
}

/// Conversation grouping of related emails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailThread {
    pub id: Uuid,
    pub subject: String,
    pub participant_emails: Vec<String>,
    pub last_activity_at: DateTime<Utc>,
    pub email_count: i64,
    pub has_unread: bool,
    pub is_archived: bool,
    pub is_important: bool,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EmailThread {
    pub fn new(subject: impl Into<String>, participants: &[&str], now: DateTime<Utc>) -> Self {
        let mut participant_emails: Vec<String> = participants
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        participant_emails.sort();
        participant_emails.dedup();

        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            participant_emails,
            last_activity_at: now,
            email_count: 0,
            has_unread: false,
            is_archived: false,
            is_important: false,
            category: None,
            supplier_id: None,
            buyer_id: None,
            user_id: None,
            created_at: now,
            updated_at: None,
        }
    }

    /// Records one more message in the thread.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.email_count += 1;
        self.last_activity_at = now;
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailAttachment {
    pub id: Uuid,
    pub email_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub is_inline: bool,
    pub content_id: Option<String>,
    pub content: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}
