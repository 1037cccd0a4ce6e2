use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    /// Non-success answer from the provider API.
    #[error("SendGrid Error: {status} - {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Template '{template}' requires variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error("Template render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("{transport} transport does not support {feature}")]
    Unsupported {
        transport: &'static str,
        feature: &'static str,
    },

    #[error("Sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MailError {
    pub fn invalid_address(address: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.to_string(),
        }
    }
}

pub type MailResult<T> = Result<T, MailError>;
