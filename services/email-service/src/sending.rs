//! Outbound mail: persist first, then hand the message to the transport and record the outcome.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use foodx_database::{EmailAttachmentQueries, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_mail::{Address, MailAttachment, OutboundEmail, TransactionalEmailService};
use foodx_models::{Email, EmailAttachment, EmailDirection, EmailStatus, EmailThread};
use foodx_utils::transaction::finish;
use foodx_utils::{validate_model, FoodxError, FoodxResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::{AttachmentDto, EmailRequest};
use crate::metrics::{record_message, MessageOutcome};

pub const EMAIL_ID_HEADER: &str = "X-FoodX-EmailId";
pub const CATEGORY_HEADER: &str = "X-FoodX-Category";

const REPLY_PREFIX: &str = "RE: ";

/// Persisted mailbox over a unit-of-work factory and a mail transport.
pub struct EmailService<F: UnitOfWorkFactory> {
    pub(crate) factory: F,
    pub(crate) mail: Arc<TransactionalEmailService>,
}

impl<F: UnitOfWorkFactory> EmailService<F> {
    pub fn new(factory: F, mail: Arc<TransactionalEmailService>) -> Self {
        Self { factory, mail }
    }

    pub fn mail(&self) -> &TransactionalEmailService {
        &self.mail
    }

    /// Stores the message as pending, delivers it and returns the stored record with the
    /// delivery outcome. A provider failure is recorded on the email, not returned.
    pub async fn send(&self, request: EmailRequest) -> FoodxResult<Email> {
        let files = prepare(&request)?;
        self.send_prepared(request, files).await
    }

    /// Validates the whole batch before sending any of it, then sends each request in
    /// turn; a delivery failure does not stop the rest.
    pub async fn send_bulk(&self, requests: Vec<EmailRequest>) -> FoodxResult<Vec<Email>> {
        let prepared = requests
            .into_iter()
            .map(|request| prepare(&request).map(|files| (request, files)))
            .collect::<FoodxResult<Vec<_>>>()?;

        let mut results = Vec::with_capacity(prepared.len());
        for (request, files) in prepared {
            results.push(self.send_prepared(request, files).await?);
        }
        Ok(results)
    }

    async fn send_prepared(&self, request: EmailRequest, files: Vec<DecodedAttachment>) -> FoodxResult<Email> {
        let now = Utc::now();
        let uow = self.factory.unit_of_work();

        let thread_id = match request.reply_to_email_id {
            Some(id) => uow.emails().get_by_id(id).await?.and_then(|e| e.thread_id),
            None => None,
        };
        let email = self.compose(&request, thread_id, now)?;

        uow.begin_transaction().await?;
        let stored = store_outbound(&uow, email, files, now).await;
        let (email, attachments) = finish(&uow, stored).await?;

        self.dispatch(&uow, email, &attachments).await
    }

    /// Answers `original_id`. Missing sender and recipient are taken from the original,
    /// swapped; the original gets a thread if it had none.
    pub async fn reply(&self, original_id: Uuid, mut request: EmailRequest) -> FoodxResult<Email> {
        let uow = self.factory.unit_of_work();
        let mut original = uow
            .emails()
            .get_by_id(original_id)
            .await?
            .ok_or_else(|| FoodxError::not_found(format!("Email {}", original_id)))?;

        if original.thread_id.is_none() {
            let now = Utc::now();
            let mut thread = EmailThread::new(
                original.subject.clone(),
                &[original.from_email.as_str(), original.to_email.as_str()],
                now,
            );
            thread.category = original.category.clone();
            thread.touch(original.created_at);

            uow.begin_transaction().await?;
            let linked = async {
                let thread = uow.email_threads().add(thread).await?;
                original.thread_id = Some(thread.id);
                uow.emails().update(original.clone()).await?;
                Ok::<EmailThread, FoodxError>(thread)
            }
            .await;
            let thread = finish(&uow, linked).await?;
            info!(email_id = %original.id, thread_id = %thread.id, "Thread created for reply");
        }

        if request.to.trim().is_empty() {
            request.to = original.from_email.clone();
        }
        if request.from.as_deref().map_or(true, |f| f.trim().is_empty()) {
            request.from = Some(original.to_email.clone());
        }
        request.subject = reply_subject(if request.subject.trim().is_empty() {
            &original.subject
        } else {
            &request.subject
        });
        if request.category.is_none() {
            request.category = original.category.clone();
        }
        request.reply_to_email_id = Some(original.id);

        self.send(request).await
    }

    /// Delivers a failed or pending email again, in place.
    pub async fn resend(&self, email_id: Uuid) -> FoodxResult<Email> {
        let uow = self.factory.unit_of_work();
        let email = uow
            .emails()
            .get_by_id(email_id)
            .await?
            .ok_or_else(|| FoodxError::not_found(format!("Email {}", email_id)))?;

        if email.direction != EmailDirection::Outbound
            || !matches!(email.status, EmailStatus::Failed | EmailStatus::Pending)
        {
            return Err(FoodxError::conflict(format!(
                "Email {} is {} and cannot be resent",
                email.id,
                email.status.as_str()
            )));
        }

        let attachments = uow.email_attachments().by_email(email.id).await?;
        info!(email_id = %email.id, previous_error = ?email.error_message, "Resending email");
        self.dispatch(&uow, email, &attachments).await
    }

    fn compose(&self, request: &EmailRequest, thread_id: Option<Uuid>, now: DateTime<Utc>) -> FoodxResult<Email> {
        let from = request
            .from
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(self.mail.sender().email.as_str())
            .to_lowercase();

        let mut email = Email::outbound(from, request.to.trim().to_lowercase(), request.subject.clone(), now);
        email.thread_id = thread_id;
        email.cc_email = join_addresses(request.cc.as_deref());
        email.bcc_email = join_addresses(request.bcc.as_deref());
        email.html_body = request.html_body.clone();
        email.plain_text_body = request.plain_text_body.clone();
        email.provider = Some(self.mail.transport_name().to_string());
        email.supplier_id = request.supplier_id;
        email.buyer_id = request.buyer_id;
        email.user_id = request.user_id.clone();
        email.category = request.category.clone();
        email.metadata = match &request.metadata {
            Some(metadata) if !metadata.is_empty() => Some(serde_json::to_string(metadata)?),
            _ => None,
        };
        Ok(email)
    }

    /// Hands a stored email to the transport and saves the outcome.
    async fn dispatch(
        &self,
        uow: &F::UnitOfWork,
        mut email: Email,
        attachments: &[EmailAttachment],
    ) -> FoodxResult<Email> {
        let message = outbound_message(&email, attachments, self.mail.sender());
        let now = Utc::now();

        match self.mail.deliver(message).await {
            Ok(receipt) => {
                email.mark_sent(receipt.message_id, now);
                record_message(MessageOutcome::Sent);
                info!(
                    email_id = %email.id,
                    to = %email.to_email,
                    transport = %receipt.transport,
                    message_id = ?email.message_id,
                    "Email sent"
                );
            }
            Err(e) => {
                email.mark_failed(e.to_string(), now);
                record_message(MessageOutcome::Failed);
                warn!(email_id = %email.id, to = %email.to_email, error = %e, "Email marked as failed");
            }
        }

        Ok(uow.emails().update(email).await?)
    }
}

async fn store_outbound<U: UnitOfWork>(
    uow: &U,
    email: Email,
    files: Vec<DecodedAttachment>,
    now: DateTime<Utc>,
) -> FoodxResult<(Email, Vec<EmailAttachment>)> {
    if let Some(thread_id) = email.thread_id {
        if let Some(mut thread) = uow.email_threads().get_by_id(thread_id).await? {
            thread.touch(now);
            uow.email_threads().update(thread).await?;
        }
    }

    let email = uow.emails().add(email).await?;
    let mut attachments = Vec::with_capacity(files.len());
    for file in files {
        attachments.push(uow.email_attachments().add(file.into_attachment(email.id, now)).await?);
    }
    Ok((email, attachments))
}

struct DecodedAttachment {
    file_name: String,
    content_type: String,
    content: Vec<u8>,
    is_inline: bool,
    content_id: Option<String>,
}

impl DecodedAttachment {
    fn into_attachment(self, email_id: Uuid, now: DateTime<Utc>) -> EmailAttachment {
        EmailAttachment {
            id: Uuid::new_v4(),
            email_id,
            file_size: self.content.len() as i64,
            file_name: self.file_name,
            content_type: self.content_type,
            is_inline: self.is_inline,
            content_id: self.content_id,
            content: Some(self.content),
            created_at: now,
        }
    }
}

/// Validates the request and decodes its attachments.
fn prepare(request: &EmailRequest) -> FoodxResult<Vec<DecodedAttachment>> {
    validate_model(request)?;
    decode_attachments(request.attachments.as_deref().unwrap_or_default())
}

fn decode_attachments(attachments: &[AttachmentDto]) -> FoodxResult<Vec<DecodedAttachment>> {
    attachments
        .iter()
        .map(|attachment| {
            let content = STANDARD.decode(attachment.base64_content.trim()).map_err(|e| {
                FoodxError::validation(
                    "attachments",
                    format!("Attachment '{}' is not valid base64: {}", attachment.file_name, e),
                )
            })?;
            let content_type = if attachment.content_type.trim().is_empty() {
                content_type_for(&attachment.file_name).to_string()
            } else {
                attachment.content_type.clone()
            };
            Ok(DecodedAttachment {
                file_name: attachment.file_name.clone(),
                content_type,
                content,
                is_inline: attachment.is_inline,
                content_id: attachment.content_id.clone(),
            })
        })
        .collect()
}

fn outbound_message(email: &Email, attachments: &[EmailAttachment], default_sender: &Address) -> OutboundEmail {
    let sender_name = default_sender.name.clone().unwrap_or_default();
    let mut message = OutboundEmail::new(email.subject.clone())
        .sender(Address::named(email.from_email.clone(), sender_name))
        .to(email.to_email.as_str())
        .header(EMAIL_ID_HEADER, email.id.to_string());

    if let Some(category) = &email.category {
        message = message.header(CATEGORY_HEADER, category.clone());
    }
    message.cc = split_addresses(email.cc_email.as_deref());
    message.bcc = split_addresses(email.bcc_email.as_deref());
    message.html_body = email.html_body.clone();
    message.text_body = email.plain_text_body.clone();

    for attachment in attachments {
        message = message.attachment(MailAttachment {
            filename: attachment.file_name.clone(),
            content_type: attachment.content_type.clone(),
            content: attachment.content.clone().unwrap_or_default(),
            inline: attachment.is_inline,
            content_id: attachment.content_id.clone(),
        });
    }
    message
}

/// `RE: ` prefix, unless the subject already carries one.
pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.to_ascii_uppercase().starts_with("RE:") {
        subject.to_string()
    } else {
        format!("{}{}", REPLY_PREFIX, subject)
    }
}

fn join_addresses(addresses: Option<&[String]>) -> Option<String> {
    let joined = addresses?
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(";");
    (!joined.is_empty()).then_some(joined)
}

fn split_addresses(joined: Option<&str>) -> Vec<Address> {
    joined
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(Address::from)
        .collect()
}

/// Guesses a MIME type from the file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
