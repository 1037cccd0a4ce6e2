//! Inbound mail and provider delivery events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use foodx_database::{
    normalize_subject, EmailQueries, EmailThreadQueries, Repository, UnitOfWork, UnitOfWorkFactory,
};
use foodx_models::{Email, EmailAttachment, EmailStatus, EmailThread};
use foodx_utils::transaction::finish;
use foodx_utils::{extract_email_address, FoodxError, FoodxResult};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::{DeliveryEvent, InboundEmail};
use crate::metrics::{record_event, record_message, MessageOutcome};
use crate::sending::{content_type_for, EmailService};

pub const INBOUND_PROVIDER: &str = "sendgrid";

/// What a delivery event does to the email it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Delivered,
    Failed,
    Opened,
}

impl EventKind {
    pub fn parse(event: &str) -> Option<Self> {
        match event.trim().to_ascii_lowercase().as_str() {
            "delivered" => Some(Self::Delivered),
            "failed" | "bounce" | "dropped" => Some(Self::Failed),
            "open" => Some(Self::Opened),
            _ => None,
        }
    }
}

impl<F: UnitOfWorkFactory> EmailService<F> {
    /// Stores a message posted by the inbound webhook and files it into a thread: the
    /// thread of the latest exchange between the same two addresses, else one with the
    /// same normalized subject, else a new one.
    pub async fn receive(&self, inbound: InboundEmail) -> FoodxResult<Email> {
        let (_, from) = extract_email_address(&inbound.from);
        let (_, to) = extract_email_address(inbound.to.split(',').next().unwrap_or_default());
        if from.is_empty() || to.is_empty() {
            return Err(FoodxError::validation("from", "Inbound email needs a sender and a recipient"));
        }

        let now = Utc::now();
        let uow = self.factory.unit_of_work();
        uow.begin_transaction().await?;
        let stored = store_inbound(&uow, &inbound, from, to, now).await;
        let email = finish(&uow, stored).await?;

        record_message(MessageOutcome::Received);
        info!(
            email_id = %email.id,
            from = %email.from_email,
            thread_id = ?email.thread_id,
            attachments = inbound.attachments.len(),
            "Inbound email stored"
        );
        Ok(email)
    }

    /// Applies provider delivery events and returns how many changed an email. Events for
    /// unknown messages and unknown event types are skipped.
    pub async fn apply_events(&self, events: &[DeliveryEvent]) -> FoodxResult<usize> {
        let uow = self.factory.unit_of_work();
        let mut applied = 0;

        for event in events {
            let Some(kind) = EventKind::parse(&event.event) else {
                debug!(event = %event.event, "Ignoring delivery event type");
                continue;
            };
            let Some(mut email) = find_by_provider_id(&uow, event).await? else {
                debug!(event = %event.event, sg_message_id = ?event.sg_message_id, "No email for delivery event");
                continue;
            };

            let at = event.occurred_at().unwrap_or_else(Utc::now);
            apply_event(&mut email, kind, event, at);
            record_event(&event.event.to_ascii_lowercase());
            uow.emails().update(email).await?;
            applied += 1;
        }

        Ok(applied)
    }
}

async fn store_inbound<U: UnitOfWork>(
    uow: &U,
    inbound: &InboundEmail,
    from: String,
    to: String,
    now: DateTime<Utc>,
) -> FoodxResult<Email> {
    let mut thread = match uow.emails().latest_between(&from, &to).await?.and_then(|e| e.thread_id) {
        Some(thread_id) => uow.email_threads().get_by_id(thread_id).await?,
        None => None,
    };
    if thread.is_none() {
        thread = uow.email_threads().by_subject(&inbound.subject).await?;
    }
    let mut thread = match thread {
        Some(thread) => thread,
        None => {
            let subject = normalize_subject(&inbound.subject);
            let subject = if subject.is_empty() { inbound.subject.clone() } else { subject };
            uow.email_threads()
                .add(EmailThread::new(subject, &[from.as_str(), to.as_str()], now))
                .await?
        }
    };

    for participant in [&from, &to] {
        if !thread.participant_emails.contains(participant) {
            thread.participant_emails.push(participant.clone());
        }
    }
    thread.touch(now);
    thread.has_unread = true;
    let thread = uow.email_threads().update(thread).await?;

    let mut email = Email::inbound(from, to, inbound.subject.clone(), now);
    email.thread_id = Some(thread.id);
    email.category = thread.category.clone();
    email.html_body = inbound.html.clone();
    email.plain_text_body = inbound.text.clone();
    email.provider = Some(INBOUND_PROVIDER.to_string());
    email.message_id = inbound.headers.as_deref().and_then(message_id_from_headers);
    email.metadata = Some(
        json!({
            "headers": inbound.headers,
            "spam_score": inbound.spam_score,
            "dkim": inbound.dkim,
            "spf": inbound.spf,
        })
        .to_string(),
    );
    let email = uow.emails().add(email).await?;

    for file in &inbound.attachments {
        let content_type = file
            .content_type
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| content_type_for(&file.file_name).to_string());
        uow.email_attachments()
            .add(EmailAttachment {
                id: Uuid::new_v4(),
                email_id: email.id,
                file_name: file.file_name.clone(),
                content_type,
                file_size: file.content.len() as i64,
                is_inline: false,
                content_id: None,
                content: Some(file.content.clone()),
                created_at: now,
            })
            .await?;
    }

    Ok(email)
}

/// Looks up by the full provider id first, then by the part before the first `.`.
async fn find_by_provider_id<U: UnitOfWork>(uow: &U, event: &DeliveryEvent) -> FoodxResult<Option<Email>> {
    let Some(full) = event.sg_message_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    if let Some(email) = uow.emails().by_message_id(full).await? {
        return Ok(Some(email));
    }
    match event.message_id() {
        Some(prefix) if prefix != full => Ok(uow.emails().by_message_id(prefix).await?),
        _ => Ok(None),
    }
}

pub fn apply_event(email: &mut Email, kind: EventKind, event: &DeliveryEvent, at: DateTime<Utc>) {
    match kind {
        EventKind::Delivered => {
            email.status = EmailStatus::Delivered;
            if email.sent_at.is_none() {
                email.sent_at = Some(at);
            }
        }
        EventKind::Failed => {
            email.status = EmailStatus::Failed;
            email.failed_at = Some(at);
            email.error_message = Some(
                event
                    .reason
                    .clone()
                    .or_else(|| event.response.clone())
                    .unwrap_or_else(|| event.event.clone()),
            );
        }
        EventKind::Opened => {
            email.status = EmailStatus::Read;
            email.read_at.get_or_insert(at);
        }
    }
}

/// `Message-ID` from the webhook's `headers` field: a JSON object or raw `Name: value` lines.
pub fn message_id_from_headers(headers: &str) -> Option<String> {
    let parsed: Option<BTreeMap<String, serde_json::Value>> = serde_json::from_str(headers).ok();
    let value = match parsed {
        Some(map) => map
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("message-id"))
            .and_then(|(_, value)| value.as_str().map(str::to_string)),
        None => headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("message-id")
                .then(|| value.trim().to_string())
        }),
    }?;

    let id = value.trim().trim_start_matches('<').trim_end_matches('>').trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, reason: Option<&str>) -> DeliveryEvent {
        DeliveryEvent {
            event: kind.to_string(),
            email: Some("buyer@fresh.example".into()),
            sg_message_id: Some("sg-1.filter".into()),
            timestamp: Some(1_700_000_000),
            reason: reason.map(str::to_string),
            response: None,
        }
    }

    #[test]
    fn test_message_id_from_raw_headers() {
        let raw = "Received: by mx.example\nMessage-ID: <CAF123@mail.example>\nSubject: Hi";
        assert_eq!(message_id_from_headers(raw).as_deref(), Some("CAF123@mail.example"));
    }

    #[test]
    fn test_message_id_from_json_headers() {
        let raw = r#"{"message-id": "<abc@mail.example>", "subject": "Hi"}"#;
        assert_eq!(message_id_from_headers(raw).as_deref(), Some("abc@mail.example"));
        assert!(message_id_from_headers("Subject: no id").is_none());
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(EventKind::parse("bounce"), Some(EventKind::Failed));
        assert_eq!(EventKind::parse("Delivered"), Some(EventKind::Delivered));
        assert_eq!(EventKind::parse("click"), None);
    }

    #[test]
    fn test_failure_event_keeps_reason() {
        let mut email = Email::outbound("ops@fdx.trading", "buyer@fresh.example", "Quote", Utc::now());
        let at = Utc::now();
        apply_event(&mut email, EventKind::Failed, &event("bounce", Some("550 mailbox unavailable")), at);
        assert_eq!(email.status, EmailStatus::Failed);
        assert_eq!(email.failed_at, Some(at));
        assert_eq!(email.error_message.as_deref(), Some("550 mailbox unavailable"));

        apply_event(&mut email, EventKind::Failed, &event("dropped", None), at);
        assert_eq!(email.error_message.as_deref(), Some("dropped"));
    }

    #[test]
    fn test_delivered_keeps_existing_sent_at() {
        let sent = Utc::now();
        let mut email = Email::outbound("ops@fdx.trading", "buyer@fresh.example", "Quote", sent);
        email.mark_sent(Some("sg-1".into()), sent);
        let later = sent + chrono::Duration::minutes(5);

        apply_event(&mut email, EventKind::Delivered, &event("delivered", None), later);
        assert_eq!(email.status, EmailStatus::Delivered);
        assert_eq!(email.sent_at, Some(sent));
    }
}
