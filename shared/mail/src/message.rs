//! Provider-neutral outbound message.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            email: email.into(),
            name: (!name.trim().is_empty()).then_some(name),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => f.write_str(&self.email),
        }
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub inline: bool,
    pub content_id: Option<String>,
}

/// How recipients are grouped when the provider supports per-recipient envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    /// One envelope for every `to`, `cc` and `bcc` address.
    #[default]
    Shared,
    /// One envelope per `to` address; recipients do not see each other.
    PerRecipient,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from: Option<Address>,
    pub reply_to: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub attachments: Vec<MailAttachment>,
    /// Provider-side template rendered with `template_data`.
    pub template_id: Option<String>,
    pub template_data: Option<serde_json::Value>,
    pub envelope: Envelope,
}

impl OutboundEmail {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn sender(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: impl Into<Address>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn attachment(mut self, attachment: MailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn template(mut self, template_id: impl Into<String>, data: serde_json::Value) -> Self {
        self.template_id = Some(template_id.into());
        self.template_data = Some(data);
        self
    }

    pub fn per_recipient(mut self) -> Self {
        self.envelope = Envelope::PerRecipient;
        self
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// What the provider reported for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub transport: String,
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(Address::named("ops@fdx.trading", "FoodX Ops").to_string(), "FoodX Ops <ops@fdx.trading>");
        assert_eq!(Address::named("ops@fdx.trading", "  ").to_string(), "ops@fdx.trading");
    }

    #[test]
    fn test_builder_counts_recipients() {
        let mut email = OutboundEmail::new("Weekly update").to("a@buyer.example").to("b@buyer.example");
        email.bcc.push(Address::new("audit@fdx.trading"));
        assert_eq!(email.recipient_count(), 3);
        assert_eq!(email.envelope, Envelope::Shared);
    }
}
