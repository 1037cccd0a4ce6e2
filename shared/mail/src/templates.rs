//! Email Template Engine
//!
//! Handlebars rendering for the platform's transactional mail. HTML bodies are escaped,
//! subjects and plain-text bodies are not.

use std::collections::HashMap;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MailError, MailResult};

pub const MAGIC_LINK_TEMPLATE: &str = "magic_link";
pub const INVITATION_TEMPLATE: &str = "invitation";
pub const RFQ_ISSUED_TEMPLATE: &str = "rfq_issued";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub subject_template: String,
    pub body_html_template: String,
    pub body_text_template: String,
    pub variables: Vec<TemplateVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub default_value: Option<String>,
}

impl TemplateVariable {
    fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
            default_value: None,
        }
    }

    fn optional(name: &str, description: &str, default_value: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            default_value: Some(default_value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

pub struct TemplateEngine {
    html: Handlebars<'static>,
    plain: Handlebars<'static>,
    templates: HashMap<String, EmailTemplate>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut plain = Handlebars::new();
        plain.register_escape_fn(handlebars::no_escape);

        let mut engine = Self {
            html: Handlebars::new(),
            plain,
            templates: HashMap::new(),
        };
        engine.register_builtin_templates();
        engine
    }

    fn register_builtin_templates(&mut self) {
        self.register(EmailTemplate {
            id: MAGIC_LINK_TEMPLATE.to_string(),
            name: "Magic Link Sign-In".to_string(),
            description: "Passwordless sign-in link".to_string(),
            subject_template: "Your FoodX Sign-In Link".to_string(),
            body_html_template: r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2>Your Magic Link</h2>
<p>Click the link below to sign in to the FoodX Trading Platform:</p>
<a href="{{{magic_link}}}" style="display: inline-block; padding: 10px 20px; background-color: #667eea; color: white; text-decoration: none; border-radius: 5px;">Sign In</a>
<p style="margin-top: 20px; color: #666;">This link will expire in {{expires_minutes}} minutes and can only be used once.</p>
<p style="color: #666;">If you didn't request this, please ignore this email.</p>
</div>
"#
            .to_string(),
            body_text_template: "Sign in to FoodX Trading Platform\n\nClick this link to sign in:\n{{magic_link}}\n\nThis link expires in {{expires_minutes}} minutes and can only be used once.\n\nIf you didn't request this sign-in link, you can safely ignore this email.\n".to_string(),
            variables: vec![
                TemplateVariable::required("magic_link", "Single-use sign-in URL"),
                TemplateVariable::optional("expires_minutes", "Link lifetime in minutes", "15"),
            ],
        });

        self.register(EmailTemplate {
            id: INVITATION_TEMPLATE.to_string(),
            name: "Platform Invitation".to_string(),
            description: "Invites a buyer or supplier to join the platform".to_string(),
            subject_template: "You're Invited to Join FoodX Trading Platform".to_string(),
            body_html_template: r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2>You've Been Invited!</h2>
<p><strong>{{inviter_name}}</strong> has invited you to join the FoodX B2B Trading Platform.</p>
<p><a href="{{{invitation_url}}}" style="display: inline-block; padding: 16px 40px; background-color: #11998e; color: white; text-decoration: none; border-radius: 8px;">Accept Invitation &amp; Join</a></p>
<p style="color: #888;">This invitation link expires in {{expires_days}} days. If you need a new invitation, please contact {{inviter_name}}.</p>
</div>
"#
            .to_string(),
            body_text_template: "You're Invited to Join FoodX Trading Platform!\n\n{{inviter_name}} has invited you to join the FoodX B2B Trading Platform.\n\nAccept your invitation here:\n{{invitation_url}}\n\nNote: This invitation link expires in {{expires_days}} days.\n".to_string(),
            variables: vec![
                TemplateVariable::required("invitation_url", "Registration URL"),
                TemplateVariable::required("inviter_name", "Who sent the invitation"),
                TemplateVariable::optional("expires_days", "Invitation lifetime in days", "7"),
            ],
        });

        self.register(EmailTemplate {
            id: RFQ_ISSUED_TEMPLATE.to_string(),
            name: "RFQ Issued".to_string(),
            description: "Notifies a supplier about a newly issued RFQ".to_string(),
            subject_template: "New RFQ {{rfq_number}}: {{title}}".to_string(),
            body_html_template: r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2>Request for Quote {{rfq_number}}</h2>
<p>Dear {{contact_name}},</p>
<p>A new request for quote has been issued for <strong>{{title}}</strong> ({{category}}).</p>
<p>Please submit your quote before <strong>{{response_deadline}}</strong>.</p>
<p><a href="{{{portal_url}}}">View the RFQ in the supplier portal</a></p>
</div>
"#
            .to_string(),
            body_text_template: "Request for Quote {{rfq_number}}\n\nDear {{contact_name}},\n\nA new request for quote has been issued for {{title}} ({{category}}).\nPlease submit your quote before {{response_deadline}}.\n\n{{portal_url}}\n".to_string(),
            variables: vec![
                TemplateVariable::required("rfq_number", "Generated RFQ number"),
                TemplateVariable::required("title", "RFQ title"),
                TemplateVariable::required("response_deadline", "Quote deadline"),
                TemplateVariable::required("portal_url", "Supplier portal link"),
                TemplateVariable::optional("category", "Product category", "Uncategorized"),
                TemplateVariable::optional("contact_name", "Supplier contact", "Supplier"),
            ],
        });
    }

    /// Adds or replaces a template.
    pub fn register(&mut self, template: EmailTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get_template(&self, template_id: &str) -> Option<&EmailTemplate> {
        self.templates.get(template_id)
    }

    pub fn list_templates(&self) -> Vec<&EmailTemplate> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Renders `template_id`; missing optional variables take their default.
    pub fn render(&self, template_id: &str, variables: &Value) -> MailResult<RenderedEmail> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| MailError::TemplateNotFound(template_id.to_string()))?;

        let mut data = match variables {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for variable in &template.variables {
            let present = data.get(&variable.name).is_some_and(|v| !v.is_null());
            if present {
                continue;
            }
            match (&variable.default_value, variable.required) {
                (Some(default), _) => {
                    data.insert(variable.name.clone(), Value::String(default.clone()));
                }
                (None, true) => {
                    return Err(MailError::MissingVariable {
                        template: template.id.clone(),
                        variable: variable.name.clone(),
                    })
                }
                (None, false) => {}
            }
        }
        let data = Value::Object(data);

        Ok(RenderedEmail {
            subject: self.plain.render_template(&template.subject_template, &data)?,
            body_html: self.html.render_template(&template.body_html_template, &data)?,
            body_text: self.plain.render_template(&template.body_text_template, &data)?,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_magic_link_uses_default_expiry() {
        let engine = TemplateEngine::new();
        let rendered = engine
            .render(MAGIC_LINK_TEMPLATE, &json!({ "magic_link": "https://fdx.trading/auth?token=abc" }))
            .unwrap();

        assert_eq!(rendered.subject, "Your FoodX Sign-In Link");
        assert!(rendered.body_text.contains("https://fdx.trading/auth?token=abc"));
        assert!(rendered.body_text.contains("15 minutes"));
        assert!(rendered.body_html.contains("href=\"https://fdx.trading/auth?token"));
    }

    #[test]
    fn test_html_is_escaped_but_text_is_not() {
        let engine = TemplateEngine::new();
        let rendered = engine
            .render(
                INVITATION_TEMPLATE,
                &json!({ "inviter_name": "Tom & Jerry", "invitation_url": "https://fdx.trading/join" }),
            )
            .unwrap();

        assert!(rendered.body_html.contains("Tom &amp; Jerry"));
        assert!(rendered.body_text.contains("Tom & Jerry has invited you"));
        assert!(rendered.body_text.contains("expires in 7 days"));
    }

    #[test]
    fn test_missing_required_variable() {
        let engine = TemplateEngine::new();
        let err = engine.render(INVITATION_TEMPLATE, &json!({ "inviter_name": "Ops" })).unwrap_err();
        assert!(matches!(err, MailError::MissingVariable { ref variable, .. } if variable == "invitation_url"));

        assert!(matches!(
            engine.render("nope", &json!({})),
            Err(MailError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_rfq_issued_subject() {
        let engine = TemplateEngine::new();
        let rendered = engine
            .render(
                RFQ_ISSUED_TEMPLATE,
                &json!({
                    "rfq_number": "RFQ-2026-001",
                    "title": "Organic Quinoa",
                    "response_deadline": "2026-11-01",
                    "portal_url": "http://localhost:5001/rfqs/1"
                }),
            )
            .unwrap();
        assert_eq!(rendered.subject, "New RFQ RFQ-2026-001: Organic Quinoa");
        assert!(rendered.body_text.contains("Dear Supplier"));
        assert_eq!(engine.list_templates().len(), 3);
    }
}
