//! Reading and filing stored mail: inbox, threads, read/archive/delete state and cleanup.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use foodx_database::{
    field, normalize_paging, EmailAttachmentQueries, EmailQueries, InboxFilter, Repository, UnitOfWork,
    UnitOfWorkFactory,
};
use foodx_models::{Email, EmailAttachment, EmailDirection, EmailFolder, EmailStatus};
use foodx_utils::transaction::finish;
use foodx_utils::{FoodxError, FoodxResult};
use tracing::info;
use uuid::Uuid;

use crate::dto::{CleanupReport, EmailResponse, EmailThreadResponse, InboxParams, InboxResponse};
use crate::sending::EmailService;

/// Soft-deleted emails older than this are purged.
pub const DELETED_RETENTION_DAYS: i64 = 30;
/// Drafts older than this are purged.
pub const DRAFT_RETENTION_DAYS: i64 = 7;

impl<F: UnitOfWorkFactory> EmailService<F> {
    pub async fn inbox(&self, params: InboxParams) -> FoodxResult<InboxResponse> {
        if params.user_email.trim().is_empty() {
            return Err(FoodxError::validation("user_email", "User email is required"));
        }
        let (page, page_size) = normalize_paging(params.page, params.page_size);
        let filter = InboxFilter {
            user_email: params.user_email,
            category: params.category,
            search: params.search,
        };

        let uow = self.factory.unit_of_work();
        let result = uow.emails().inbox(&filter, page, page_size).await?;
        let mut emails = Vec::with_capacity(result.items.len());
        for email in result.items {
            emails.push(with_attachments(&uow, email).await?);
        }

        Ok(InboxResponse {
            success: true,
            page: result.page,
            page_size: result.page_size,
            total_count: result.total,
            total_pages: result.total_pages,
            emails,
        })
    }

    /// The thread with its emails, oldest first; deleted emails are left out.
    pub async fn thread(&self, thread_id: Uuid) -> FoodxResult<EmailThreadResponse> {
        let uow = self.factory.unit_of_work();
        let thread = uow
            .email_threads()
            .get_by_id(thread_id)
            .await?
            .ok_or_else(|| FoodxError::not_found(format!("Email thread {}", thread_id)))?;

        let mut emails = Vec::new();
        for email in uow.emails().by_thread(thread.id).await? {
            if !email.is_deleted {
                emails.push(with_attachments(&uow, email).await?);
            }
        }
        Ok(EmailThreadResponse::new(thread, emails))
    }

    pub async fn attachment(&self, attachment_id: Uuid) -> FoodxResult<EmailAttachment> {
        self.factory
            .unit_of_work()
            .email_attachments()
            .get_by_id(attachment_id)
            .await?
            .ok_or_else(|| FoodxError::not_found(format!("Attachment {}", attachment_id)))
    }

    /// Marks the email read and recomputes its thread's unread flag.
    pub async fn mark_read(&self, email_id: Uuid) -> FoodxResult<Email> {
        let now = Utc::now();
        let uow = self.factory.unit_of_work();
        let mut email = load(&uow, email_id).await?;

        uow.begin_transaction().await?;
        let result = async {
            email.status = EmailStatus::Read;
            email.read_at = Some(now);
            let email = uow.emails().update(email).await?;
            refresh_unread(&uow, email.thread_id, now).await?;
            Ok::<Email, FoodxError>(email)
        }
        .await;
        finish(&uow, result).await
    }

    pub async fn archive(&self, email_id: Uuid) -> FoodxResult<Email> {
        let now = Utc::now();
        self.modify(email_id, |email| {
            email.is_archived = true;
            email.archived_at = Some(now);
        })
        .await
    }

    /// Moves the email to the trash; cleanup purges it after the retention period.
    pub async fn soft_delete(&self, email_id: Uuid) -> FoodxResult<Email> {
        let now = Utc::now();
        self.modify(email_id, |email| {
            email.is_deleted = true;
            email.deleted_at = Some(now);
        })
        .await
    }

    /// Takes the email out of the trash and the archive, back into its home folder.
    pub async fn restore(&self, email_id: Uuid) -> FoodxResult<Email> {
        self.modify(email_id, |email| {
            email.is_deleted = false;
            email.deleted_at = None;
            email.is_archived = false;
            email.archived_at = None;
            email.folder = match email.direction {
                EmailDirection::Inbound => EmailFolder::Inbox,
                EmailDirection::Outbound => EmailFolder::Sent,
            };
        })
        .await
    }

    /// Deletes the email and its attachments. A thread left empty goes with it.
    pub async fn delete_permanently(&self, email_id: Uuid) -> FoodxResult<()> {
        let uow = self.factory.unit_of_work();
        let email = load(&uow, email_id).await?;

        uow.begin_transaction().await?;
        let result = async {
            uow.emails().delete(email.id).await?;
            if let Some(thread_id) = email.thread_id {
                settle_thread(&uow, thread_id, Utc::now()).await?;
            }
            Ok::<(), FoodxError>(())
        }
        .await;
        finish(&uow, result).await?;

        info!(email_id = %email.id, "Email permanently deleted");
        Ok(())
    }

    /// Purges trash and stale drafts as of `now`, then threads left without emails.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> FoodxResult<CleanupReport> {
        let uow = self.factory.unit_of_work();
        uow.begin_transaction().await?;
        let result = purge(&uow, now).await;
        let report = finish(&uow, result).await?;

        info!(
            deleted_emails = report.deleted_emails,
            deleted_drafts = report.deleted_drafts,
            deleted_threads = report.deleted_threads,
            "Mailbox cleanup finished"
        );
        Ok(report)
    }

    /// Applies `change` and recomputes the thread's unread flag, since archived and
    /// deleted emails do not count as unread.
    async fn modify(&self, email_id: Uuid, change: impl FnOnce(&mut Email) + Send) -> FoodxResult<Email> {
        let uow = self.factory.unit_of_work();
        let mut email = load(&uow, email_id).await?;
        change(&mut email);

        uow.begin_transaction().await?;
        let result = async {
            let email = uow.emails().update(email).await?;
            refresh_unread(&uow, email.thread_id, Utc::now()).await?;
            Ok::<Email, FoodxError>(email)
        }
        .await;
        finish(&uow, result).await
    }
}

async fn load<U: UnitOfWork>(uow: &U, email_id: Uuid) -> FoodxResult<Email> {
    uow.emails()
        .get_by_id(email_id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("Email {}", email_id)))
}

async fn refresh_unread<U: UnitOfWork>(uow: &U, thread_id: Option<Uuid>, now: DateTime<Utc>) -> FoodxResult<()> {
    let Some(thread_id) = thread_id else {
        return Ok(());
    };
    if let Some(mut thread) = uow.email_threads().get_by_id(thread_id).await? {
        let has_unread = uow.emails().unread_in_thread(thread_id).await? > 0;
        if thread.has_unread != has_unread {
            thread.has_unread = has_unread;
            thread.updated_at = Some(now);
            uow.email_threads().update(thread).await?;
        }
    }
    Ok(())
}

async fn with_attachments<U: UnitOfWork>(uow: &U, email: Email) -> FoodxResult<EmailResponse> {
    let attachments = uow.email_attachments().by_email(email.id).await?;
    Ok(EmailResponse::new(email, &attachments))
}

/// Recounts a thread after emails left it; deletes it when none remain. Returns whether
/// the thread was deleted.
async fn settle_thread<U: UnitOfWork>(uow: &U, thread_id: Uuid, now: DateTime<Utc>) -> FoodxResult<bool> {
    let remaining = uow.emails().count(Some(field("thread_id").eq(thread_id))).await?;
    if remaining == 0 {
        return Ok(uow.email_threads().delete(thread_id).await?);
    }
    if let Some(mut thread) = uow.email_threads().get_by_id(thread_id).await? {
        thread.email_count = remaining;
        thread.has_unread = uow.emails().unread_in_thread(thread_id).await? > 0;
        thread.updated_at = Some(now);
        uow.email_threads().update(thread).await?;
    }
    Ok(false)
}

async fn purge<U: UnitOfWork>(uow: &U, now: DateTime<Utc>) -> FoodxResult<CleanupReport> {
    let mut report = CleanupReport::default();
    let mut touched = BTreeSet::new();

    let deleted = uow
        .emails()
        .deleted_before(now - Duration::days(DELETED_RETENTION_DAYS))
        .await?;
    for email in deleted {
        if uow.emails().delete(email.id).await? {
            report.deleted_emails += 1;
            touched.extend(email.thread_id);
        }
    }

    let drafts = uow
        .emails()
        .drafts_before(now - Duration::days(DRAFT_RETENTION_DAYS))
        .await?;
    for email in drafts {
        if uow.emails().delete(email.id).await? {
            report.deleted_drafts += 1;
            touched.extend(email.thread_id);
        }
    }

    for thread_id in touched {
        if settle_thread(uow, thread_id, now).await? {
            report.deleted_threads += 1;
        }
    }

    for thread in uow.email_threads().get_all().await? {
        if uow.emails().count(Some(field("thread_id").eq(thread.id))).await? == 0
            && uow.email_threads().delete(thread.id).await?
        {
            report.deleted_threads += 1;
        }
    }

    Ok(report)
}
