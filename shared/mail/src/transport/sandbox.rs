use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::MailTransport;
use crate::error::MailResult;
use crate::message::{Address, DeliveryReceipt, OutboundEmail};

/// Appends every message as one JSON line instead of delivering it.
pub struct SandboxTransport {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize)]
struct SandboxRecord<'a> {
    id: String,
    timestamp: DateTime<Utc>,
    from: Option<&'a Address>,
    to: &'a [Address],
    cc: &'a [Address],
    bcc: &'a [Address],
    subject: &'a str,
    links: Vec<String>,
    headers: &'a BTreeMap<String, String>,
    attachments: Vec<&'a str>,
    template_id: Option<&'a str>,
    template_data: Option<&'a serde_json::Value>,
    html_body: Option<&'a str>,
    text_body: Option<&'a str>,
}

impl SandboxTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MailTransport for SandboxTransport {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn send(&self, email: &OutboundEmail) -> MailResult<DeliveryReceipt> {
        let id = format!("sandbox-{}", Uuid::new_v4());
        let links = email.html_body.as_deref().map(extract_links).unwrap_or_default();
        let record = SandboxRecord {
            id: id.clone(),
            timestamp: Utc::now(),
            from: email.from.as_ref(),
            to: &email.to,
            cc: &email.cc,
            bcc: &email.bcc,
            subject: &email.subject,
            links: links.clone(),
            headers: &email.headers,
            attachments: email.attachments.iter().map(|a| a.filename.as_str()).collect(),
            template_id: email.template_id.as_deref(),
            template_data: email.template_data.as_ref(),
            html_body: email.html_body.as_deref(),
            text_body: email.text_body.as_deref(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!(
            to = ?email.to.iter().map(|a| a.email.as_str()).collect::<Vec<_>>(),
            subject = %email.subject,
            link = links.first().map(String::as_str).unwrap_or(""),
            path = %self.path.display(),
            "Email written to sandbox (not sent)"
        );

        Ok(DeliveryReceipt {
            transport: self.name().to_string(),
            message_id: Some(id),
        })
    }
}

fn href_regex() -> Option<&'static Regex> {
    static HREF: OnceLock<Option<Regex>> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"href=['"]([^'"]+)['"]"#).ok()).as_ref()
}

/// Every `href` target in `html`, in document order, without duplicates.
pub fn extract_links(html: &str) -> Vec<String> {
    let Some(re) = href_regex() else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for capture in re.captures_iter(html) {
        let link = capture[1].to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_handles_both_quote_styles() {
        let html = r#"<a href="https://fdx.trading/a?t=1">A</a><a href='https://fdx.trading/b'>B</a><a href="https://fdx.trading/a?t=1">again</a>"#;
        assert_eq!(
            extract_links(html),
            vec!["https://fdx.trading/a?t=1".to_string(), "https://fdx.trading/b".to_string()]
        );
        assert!(extract_links("<p>no links</p>").is_empty());
    }

    #[tokio::test]
    async fn test_records_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sandbox.jsonl");
        let transport = SandboxTransport::new(&path);

        for subject in ["first", "second"] {
            let email = OutboundEmail::new(subject)
                .sender(Address::new("noreply@fdx.trading"))
                .to("buyer@fresh.example")
                .html(r#"<a href="https://fdx.trading/x">x</a>"#);
            let receipt = transport.send(&email).await.unwrap();
            assert!(receipt.message_id.unwrap().starts_with("sandbox-"));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["subject"], "second");
        assert_eq!(records[0]["links"][0], "https://fdx.trading/x");
        assert_eq!(records[0]["to"][0]["email"], "buyer@fresh.example");
    }
}
