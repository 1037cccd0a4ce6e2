use std::sync::Arc;
use std::time::Duration;

use foodx_utils::EmailConfig;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::MailResult;
use crate::message::{Address, DeliveryReceipt, OutboundEmail};
use crate::templates::{TemplateEngine, INVITATION_TEMPLATE, MAGIC_LINK_TEMPLATE};
use crate::transport::{MailTransport, SandboxTransport, SendGridTransport, SmtpTransport};

/// Transactional email facade. The `send_*` helpers report success as a bool and never
/// return provider errors; `deliver` hands the error back for callers that persist it.
pub struct TransactionalEmailService {
    transport: Arc<dyn MailTransport>,
    templates: TemplateEngine,
    sender: Address,
}

impl TransactionalEmailService {
    pub fn new(transport: Arc<dyn MailTransport>, sender: Address) -> Self {
        Self {
            transport,
            templates: TemplateEngine::new(),
            sender,
        }
    }

    /// SMTP when `use_smtp` is set, the SendGrid API when a key is configured, otherwise
    /// the sandbox file.
    pub fn from_config(config: &EmailConfig) -> MailResult<Self> {
        let sender = Address::named(config.from_email.clone(), config.from_name.clone());
        let api_key = config.sendgrid.api_key.trim();

        let transport: Arc<dyn MailTransport> = if config.use_smtp {
            let password = if config.smtp.password.is_empty() {
                api_key
            } else {
                config.smtp.password.as_str()
            };
            info!(host = %config.smtp.host, port = config.smtp.port, "Email delivery via SMTP");
            Arc::new(SmtpTransport::new(
                &config.smtp.host,
                config.smtp.port,
                &config.smtp.username,
                password,
            )?)
        } else if !api_key.is_empty() {
            info!(api_url = %config.sendgrid.api_url, "Email delivery via SendGrid API");
            Arc::new(SendGridTransport::new(
                api_key,
                config.sendgrid.api_url.clone(),
                Duration::from_secs(config.sendgrid.timeout_seconds),
            )?)
        } else {
            warn!(
                path = %config.sandbox_path,
                "SendGrid API key not configured; emails are written to the sandbox only"
            );
            Arc::new(SandboxTransport::new(config.sandbox_path.clone()))
        };

        Ok(Self::new(transport, sender))
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    /// Sends `email`, filling in the default sender. Errors are logged and returned.
    pub async fn deliver(&self, email: OutboundEmail) -> MailResult<DeliveryReceipt> {
        let mut email = email;
        if email.from.is_none() {
            email.from = Some(self.sender.clone());
        }
        match self.transport.send(&email).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                error!(
                    transport = self.transport.name(),
                    subject = %email.subject,
                    recipients = email.recipient_count(),
                    error = %e,
                    "Email delivery failed"
                );
                Err(e)
            }
        }
    }

    async fn report(&self, email: OutboundEmail, what: &str) -> bool {
        let recipients = email.recipient_count();
        match self.deliver(email).await {
            Ok(receipt) => {
                info!(
                    kind = what,
                    recipients,
                    transport = %receipt.transport,
                    message_id = ?receipt.message_id,
                    "Email sent"
                );
                true
            }
            Err(_) => false,
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str, text: Option<&str>) -> bool {
        let mut email = OutboundEmail::new(subject).to(to).html(html);
        email.text_body = text.map(str::to_string);
        self.report(email, "single").await
    }

    /// Sends a provider-hosted template with `data` as its dynamic data.
    pub async fn send_template_email(&self, to: &str, template_id: &str, data: Value) -> bool {
        let email = OutboundEmail::new("").to(to).template(template_id, data);
        self.report(email, "template").await
    }

    /// Renders one of the built-in templates and sends it.
    pub async fn send_rendered(&self, to: &str, template_id: &str, variables: &Value) -> bool {
        let rendered = match self.templates.render(template_id, variables) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(template = template_id, error = %e, "Failed to render email template");
                return false;
            }
        };
        let email = OutboundEmail::new(rendered.subject)
            .to(to)
            .html(rendered.body_html)
            .text(rendered.body_text);
        self.report(email, template_id).await
    }

    /// One request addressed to every recipient, each in its own envelope.
    pub async fn send_bulk_email(&self, recipients: &[String], subject: &str, html: &str) -> bool {
        if recipients.is_empty() {
            warn!(subject, "Bulk email without recipients skipped");
            return false;
        }
        let mut email = OutboundEmail::new(subject).html(html).per_recipient();
        email.to = recipients.iter().map(|r| Address::new(r.as_str())).collect();
        self.report(email, "bulk").await
    }

    pub async fn send_magic_link(&self, email: &str, magic_link: &str) -> bool {
        self.send_rendered(email, MAGIC_LINK_TEMPLATE, &json!({ "magic_link": magic_link }))
            .await
    }

    pub async fn send_invitation(&self, email: &str, invitation_url: &str, inviter_name: &str) -> bool {
        self.send_rendered(
            email,
            INVITATION_TEMPLATE,
            &json!({ "invitation_url": invitation_url, "inviter_name": inviter_name }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records messages; fails every send when `fail` is set.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, email: &OutboundEmail) -> MailResult<DeliveryReceipt> {
            self.sent.lock().unwrap().push(email.clone());
            if self.fail {
                return Err(MailError::Provider {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(DeliveryReceipt {
                transport: "recording".into(),
                message_id: Some("m-1".into()),
            })
        }
    }

    fn service(fail: bool) -> (Arc<RecordingTransport>, TransactionalEmailService) {
        let transport = Arc::new(RecordingTransport {
            fail,
            ..Default::default()
        });
        let service = TransactionalEmailService::new(
            transport.clone(),
            Address::named("noreply@fdx.trading", "FoodX Platform"),
        );
        (transport, service)
    }

    #[tokio::test]
    async fn test_default_sender_is_applied() {
        let (transport, service) = service(false);
        assert!(service.send_email("buyer@fresh.example", "Hello", "<p>Hi</p>", None).await);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].from.as_ref().unwrap().email, "noreply@fdx.trading");
        assert!(sent[0].text_body.is_none());
    }

    #[tokio::test]
    async fn test_failures_become_false() {
        let (_, service) = service(true);
        assert!(!service.send_email("buyer@fresh.example", "Hello", "<p>Hi</p>", None).await);
        assert!(!service.send_magic_link("buyer@fresh.example", "https://fdx.trading/m").await);
    }

    #[tokio::test]
    async fn test_magic_link_subject_and_body() {
        let (transport, service) = service(false);
        assert!(service.send_magic_link("buyer@fresh.example", "https://fdx.trading/m?t=1").await);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Your FoodX Sign-In Link");
        assert!(sent[0].html_body.as_ref().unwrap().contains("https://fdx.trading/m?t=1"));
        assert!(sent[0].text_body.as_ref().unwrap().contains("15 minutes"));
    }

    #[tokio::test]
    async fn test_bulk_is_a_single_per_recipient_send() {
        let (transport, service) = service(false);
        let recipients = vec!["a@x.example".to_string(), "b@x.example".to_string()];
        assert!(service.send_bulk_email(&recipients, "News", "<p>n</p>").await);
        assert!(!service.send_bulk_email(&[], "News", "<p>n</p>").await);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.len(), 2);
        assert_eq!(sent[0].envelope, crate::message::Envelope::PerRecipient);
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_sent() {
        let (transport, service) = service(false);
        assert!(!service.send_rendered("a@x.example", "missing", &json!({})).await);
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
