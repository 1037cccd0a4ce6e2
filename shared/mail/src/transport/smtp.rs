use async_trait::async_trait;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::MailTransport;
use crate::error::{MailError, MailResult};
use crate::message::{Address, DeliveryReceipt, OutboundEmail};

/// STARTTLS relay, e.g. `smtp.sendgrid.net:587` with user `apikey`.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> MailResult<Self> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(credentials)
            .build();
        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutboundEmail) -> MailResult<DeliveryReceipt> {
        if email.template_id.is_some() {
            return Err(MailError::Unsupported {
                transport: self.name(),
                feature: "provider templates",
            });
        }
        let message = build_message(email)?;
        let response = self.mailer.send(message).await?;
        let reply = response.message().collect::<Vec<_>>().join("\n");
        info!(recipients = email.recipient_count(), reply = %reply, "SMTP relay accepted message");

        Ok(DeliveryReceipt {
            transport: self.name().to_string(),
            message_id: (!reply.is_empty()).then_some(reply),
        })
    }
}

fn mailbox(address: &Address) -> MailResult<Mailbox> {
    let email = address
        .email
        .parse()
        .map_err(|e| MailError::invalid_address(address.email.clone(), e))?;
    Ok(Mailbox::new(address.name.clone(), email))
}

fn content_type(raw: &str) -> MailResult<ContentType> {
    ContentType::parse(raw).map_err(|e| MailError::Message(format!("content type '{}': {}", raw, e)))
}

fn build_message(email: &OutboundEmail) -> MailResult<Message> {
    let from = email
        .from
        .as_ref()
        .ok_or_else(|| MailError::Message("sender address is missing".to_string()))?;

    let mut builder = Message::builder().from(mailbox(from)?).subject(email.subject.clone());
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }
    for to in &email.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &email.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    for (name, value) in &email.headers {
        let name = HeaderName::new_from_ascii(name.clone())
            .map_err(|e| MailError::Message(format!("header '{}': {}", name, e)))?;
        builder = builder.raw_header(HeaderValue::new(name, value.clone()));
    }

    let text = email.text_body.clone().unwrap_or_default();
    let body = match &email.html_body {
        Some(html) => MultiPart::alternative()
            .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
            .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html.clone())),
        None => MultiPart::mixed().singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text)),
    };

    let body = if email.attachments.is_empty() {
        body
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in &email.attachments {
            let kind = content_type(&attachment.content_type)?;
            let part = match (&attachment.content_id, attachment.inline) {
                (Some(content_id), true) => Attachment::new_inline(content_id.clone()),
                _ => Attachment::new(attachment.filename.clone()),
            }
            .body(attachment.content.clone(), kind);
            mixed = mixed.singlepart(part);
        }
        mixed
    };

    builder
        .multipart(body)
        .map_err(|e| MailError::Message(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MailAttachment;

    #[test]
    fn test_message_carries_custom_headers_and_attachments() {
        let email = OutboundEmail::new("Certificates")
            .sender(Address::named("noreply@fdx.trading", "FoodX Platform"))
            .to("buyer@fresh.example")
            .html("<p>Attached</p>")
            .text("Attached")
            .header("X-FoodX-EmailId", "42")
            .attachment(MailAttachment {
                filename: "kosher.pdf".into(),
                content_type: "application/pdf".into(),
                content: vec![1, 2, 3],
                inline: false,
                content_id: None,
            });

        let raw = String::from_utf8(build_message(&email).unwrap().formatted()).unwrap();
        assert!(raw.contains("X-FoodX-EmailId: 42"));
        assert!(raw.contains("kosher.pdf"));
        assert!(raw.contains("Subject: Certificates"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let email = OutboundEmail::new("x")
            .sender(Address::new("noreply@fdx.trading"))
            .to("not an address");
        assert!(matches!(build_message(&email), Err(MailError::InvalidAddress { .. })));
    }
}
