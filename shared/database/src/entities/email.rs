use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{
    Email, EmailAttachment, EmailDirection, EmailFolder, EmailStatus, EmailThread,
};

use crate::entity::{Entity, ForeignKey, OnDelete};
use crate::value::Value;

impl Entity for EmailThread {
    const TABLE: &'static str = "email_threads";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "subject",
        "participant_emails",
        "last_activity_at",
        "email_count",
        "has_unread",
        "is_archived",
        "is_important",
        "category",
        "supplier_id",
        "buyer_id",
        "user_id",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        let participants = serde_json::Value::from(self.participant_emails.clone());
        vec![
            self.id.into(),
            (&self.subject).into(),
            participants.into(),
            self.last_activity_at.into(),
            self.email_count.into(),
            self.has_unread.into(),
            self.is_archived.into(),
            self.is_important.into(),
            (&self.category).into(),
            self.supplier_id.into(),
            self.buyer_id.into(),
            (&self.user_id).into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        EmailThreadRow::from_row(row).map(|r| Self {
            id: r.id,
            subject: r.subject,
            participant_emails: serde_json::from_value(r.participant_emails).unwrap_or_default(),
            last_activity_at: r.last_activity_at,
            email_count: r.email_count,
            has_unread: r.has_unread,
            is_archived: r.is_archived,
            is_important: r.is_important,
            category: r.category,
            supplier_id: r.supplier_id,
            buyer_id: r.buyer_id,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EmailThreadRow {
    id: Uuid,
    subject: String,
    participant_emails: serde_json::Value,
    last_activity_at: DateTime<Utc>,
    email_count: i64,
    has_unread: bool,
    is_archived: bool,
    is_important: bool,
    category: Option<String>,
    supplier_id: Option<Uuid>,
    buyer_id: Option<Uuid>,
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Entity for Email {
    const TABLE: &'static str = "emails";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "message_id",
        "thread_id",
        "from_email",
        "to_email",
        "cc_email",
        "bcc_email",
        "subject",
        "html_body",
        "plain_text_body",
        "direction",
        "status",
        "provider",
        "supplier_id",
        "buyer_id",
        "user_id",
        "category",
        "metadata",
        "folder",
        "is_archived",
        "archived_at",
        "is_deleted",
        "deleted_at",
        "created_at",
        "sent_at",
        "received_at",
        "read_at",
        "failed_at",
        "error_message",
    ];
    const FOREIGN_KEYS: &'static [ForeignKey] =
        &[ForeignKey::new("thread_id", EmailThread::TABLE, OnDelete::SetNull)];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.message_id).into(),
            self.thread_id.into(),
            (&self.from_email).into(),
            (&self.to_email).into(),
            (&self.cc_email).into(),
            (&self.bcc_email).into(),
            (&self.subject).into(),
            (&self.html_body).into(),
            (&self.plain_text_body).into(),
            self.direction.as_str().into(),
            self.status.as_str().into(),
            (&self.provider).into(),
            self.supplier_id.into(),
            self.buyer_id.into(),
            (&self.user_id).into(),
            (&self.category).into(),
            (&self.metadata).into(),
            self.folder.as_str().into(),
            self.is_archived.into(),
            self.archived_at.into(),
            self.is_deleted.into(),
            self.deleted_at.into(),
            self.created_at.into(),
            self.sent_at.into(),
            self.received_at.into(),
            self.read_at.into(),
            self.failed_at.into(),
            (&self.error_message).into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        EmailRow::from_row(row).map(Into::into)
    }
}

#[derive(Debug, FromRow)]
struct EmailRow {
    id: Uuid,
    message_id: Option<String>,
    thread_id: Option<Uuid>,
    from_email: String,
    to_email: String,
    cc_email: Option<String>,
    bcc_email: Option<String>,
    subject: String,
    html_body: Option<String>,
    plain_text_body: Option<String>,
    direction: String,
    status: String,
    provider: Option<String>,
    supplier_id: Option<Uuid>,
    buyer_id: Option<Uuid>,
    user_id: Option<String>,
    category: Option<String>,
    metadata: Option<String>,
    folder: String,
    is_archived: bool,
    archived_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl From<EmailRow> for Email {
    fn from(row: EmailRow) -> Self {
        Self {
            id: row.id,
            message_id: row.message_id,
            thread_id: row.thread_id,
            from_email: row.from_email,
            to_email: row.to_email,
            cc_email: row.cc_email,
            bcc_email: row.bcc_email,
            subject: row.subject,
            html_body: row.html_body,
            plain_text_body: row.plain_text_body,
            direction: EmailDirection::from_str(&row.direction).unwrap_or(EmailDirection::Outbound),
            status: EmailStatus::from_str(&row.status).unwrap_or_default(),
            provider: row.provider,
            supplier_id: row.supplier_id,
            buyer_id: row.buyer_id,
            user_id: row.user_id,
            category: row.category,
            metadata: row.metadata,
            folder: EmailFolder::from_str(&row.folder).unwrap_or_default(),
            is_archived: row.is_archived,
            archived_at: row.archived_at,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            sent_at: row.sent_at,
            received_at: row.received_at,
            read_at: row.read_at,
            failed_at: row.failed_at,
            error_message: row.error_message,
        }
    }
}

impl Entity for EmailAttachment {
    const TABLE: &'static str = "email_attachments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email_id",
        "file_name",
        "content_type",
        "file_size",
        "is_inline",
        "content_id",
        "content",
        "created_at",
    ];
    const FOREIGN_KEYS: &'static [ForeignKey] =
        &[ForeignKey::new("email_id", Email::TABLE, OnDelete::Cascade)];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.email_id.into(),
            (&self.file_name).into(),
            (&self.content_type).into(),
            self.file_size.into(),
            self.is_inline.into(),
            (&self.content_id).into(),
            self.content.clone().into(),
            self.created_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        EmailAttachmentRow::from_row(row).map(|r| Self {
            id: r.id,
            email_id: r.email_id,
            file_name: r.file_name,
            content_type: r.content_type,
            file_size: r.file_size,
            is_inline: r.is_inline,
            content_id: r.content_id,
            content: r.content,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EmailAttachmentRow {
    id: Uuid,
    email_id: Uuid,
    file_name: String,
    content_type: String,
    file_size: i64,
    is_inline: bool,
    content_id: Option<String>,
    content: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
}
