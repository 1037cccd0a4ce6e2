//! Transactional email for the FoodX platform.
//!
//! ```no_run
//! use foodx_mail::TransactionalEmailService;
//! use foodx_utils::AppConfig;
//!
//! # async fn run() -> Result<(), foodx_mail::MailError> {
//! let config = AppConfig::default();
//! let mail = TransactionalEmailService::from_config(&config.email)?;
//! mail.send_magic_link("buyer@fresh.example", "https://fdx.trading/auth?token=abc").await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod message;
pub mod service;
pub mod templates;
pub mod transport;

pub use error::{MailError, MailResult};
pub use message::{Address, DeliveryReceipt, Envelope, MailAttachment, OutboundEmail};
pub use service::TransactionalEmailService;
pub use templates::{EmailTemplate, RenderedEmail, TemplateEngine, TemplateVariable};
pub use transport::{extract_links, MailTransport, SandboxTransport, SendGridTransport, SmtpTransport};
