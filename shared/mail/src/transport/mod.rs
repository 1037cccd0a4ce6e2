//! Delivery backends.

mod sandbox;
mod sendgrid;
mod smtp;

use async_trait::async_trait;

use crate::error::MailResult;
use crate::message::{DeliveryReceipt, OutboundEmail};

pub use sandbox::{extract_links, SandboxTransport};
pub use sendgrid::SendGridTransport;
pub use smtp::SmtpTransport;

#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hands the message to the backend. `email.from` is always set by the caller.
    async fn send(&self, email: &OutboundEmail) -> MailResult<DeliveryReceipt>;
}
