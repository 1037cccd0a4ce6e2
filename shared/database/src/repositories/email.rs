//! Mailbox queries for the email service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foodx_models::{Email, EmailAttachment, EmailDirection, EmailFolder, EmailStatus, EmailThread};
use uuid::Uuid;

use crate::error::RepositoryResult;
use crate::predicate::{field, Predicate};
use crate::query::{Page, Query};
use crate::repository::Repository;

/// Filters for a user's inbox listing.
#[derive(Debug, Clone, Default)]
pub struct InboxFilter {
    pub user_email: String,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl InboxFilter {
    pub fn to_query(&self) -> Query {
        let user = self.user_email.trim().to_lowercase();
        let mut query = Query::new()
            .filter(field("to_email").eq(user.as_str()).or(field("from_email").eq(user.as_str())))
            .filter(field("is_deleted").eq(false))
            .filter(field("is_archived").eq(false))
            .filter(field("folder").eq(EmailFolder::Inbox.as_str()))
            .filter(field("direction").eq(EmailDirection::Inbound.as_str()));

        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(field("category").eq(category));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(Predicate::Or(vec![
                field("subject").contains(term),
                field("from_email").contains(term),
                field("plain_text_body").contains(term),
            ]));
        }
        query.order_by_desc("created_at")
    }
}

#[async_trait]
pub trait EmailQueries: Repository<Email> {
    async fn inbox(&self, filter: &InboxFilter, page: i64, page_size: i64) -> RepositoryResult<Page<Email>> {
        self.page(filter.to_query(), page, page_size).await
    }

    /// Emails of a thread, oldest first.
    async fn by_thread(&self, thread_id: Uuid) -> RepositoryResult<Vec<Email>> {
        self.query(
            Query::new()
                .filter(field("thread_id").eq(thread_id))
                .order_by_asc("created_at"),
        )
        .await
    }

    async fn by_message_id(&self, message_id: &str) -> RepositoryResult<Option<Email>> {
        self.first(field("message_id").eq(message_id)).await
    }

    /// Most recent threaded email exchanged between two addresses, in either direction.
    async fn latest_between(&self, a: &str, b: &str) -> RepositoryResult<Option<Email>> {
        let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
        let pair = field("from_email")
            .eq(a.as_str())
            .and(field("to_email").eq(b.as_str()))
            .or(field("from_email").eq(b.as_str()).and(field("to_email").eq(a.as_str())));

        let mut emails = self
            .query(
                Query::new()
                    .filter(pair)
                    .filter(field("thread_id").is_not_null())
                    .order_by_desc("created_at")
                    .limit(1),
            )
            .await?;
        Ok(emails.pop())
    }

    async fn unread_in_thread(&self, thread_id: Uuid) -> RepositoryResult<i64> {
        self.count(Some(
            field("thread_id")
                .eq(thread_id)
                .and(field("direction").eq(EmailDirection::Inbound.as_str()))
                .and(field("read_at").is_null())
                .and(field("is_archived").eq(false))
                .and(field("is_deleted").eq(false)),
        ))
        .await
    }

    async fn deleted_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<Vec<Email>> {
        self.find(field("is_deleted").eq(true).and(field("deleted_at").lt(cutoff)))
            .await
    }

    async fn drafts_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<Vec<Email>> {
        self.find(
            field("status")
                .eq(EmailStatus::Draft.as_str())
                .and(field("created_at").lt(cutoff)),
        )
        .await
    }
}

impl<R: Repository<Email> + ?Sized> EmailQueries for R {}

#[async_trait]
pub trait EmailThreadQueries: Repository<EmailThread> {
    /// Thread whose subject matches once reply and forward prefixes are removed.
    async fn by_subject(&self, subject: &str) -> RepositoryResult<Option<EmailThread>> {
        let normalized = normalize_subject(subject);
        if normalized.is_empty() {
            return Ok(None);
        }
        let candidates = self
            .query(
                Query::new()
                    .filter(field("subject").contains(normalized.as_str()))
                    .order_by_desc("last_activity_at"),
            )
            .await?;
        Ok(candidates
            .into_iter()
            .find(|thread| normalize_subject(&thread.subject).eq_ignore_ascii_case(&normalized)))
    }
}

impl<R: Repository<EmailThread> + ?Sized> EmailThreadQueries for R {}

#[async_trait]
pub trait EmailAttachmentQueries: Repository<EmailAttachment> {
    async fn by_email(&self, email_id: Uuid) -> RepositoryResult<Vec<EmailAttachment>> {
        self.find(field("email_id").eq(email_id)).await
    }
}

impl<R: Repository<EmailAttachment> + ?Sized> EmailAttachmentQueries for R {}

/// Strips any run of `RE:`, `FW:` and `FWD:` prefixes.
pub fn normalize_subject(subject: &str) -> String {
    let mut rest = subject.trim();
    loop {
        let lower = rest.to_ascii_lowercase();
        let prefix_len = ["re:", "fwd:", "fw:"]
            .iter()
            .find(|prefix| lower.starts_with(*prefix))
            .map(|prefix| prefix.len());
        match prefix_len {
            Some(len) => rest = rest[len..].trim_start(),
            None => return rest.to_string(),
        }
    }
}
