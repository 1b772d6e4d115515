//! Briefing delivery.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, instrument};

use trendbrief_shared::{Recipient, Result, RunId, TrendbriefError};

/// Delivers a finished briefing to its recipients.
pub trait Notifier: Send + Sync {
    /// Send `body` under `subject`; the notifier applies its own subject prefix.
    fn send(
        &self,
        recipients: &[Recipient],
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// `"{prefix} {subject}"`, trimmed so an empty prefix leaves no leading space.
pub fn prefixed_subject(prefix: &str, subject: &str) -> String {
    format!("{prefix} {subject}").trim().to_string()
}

/// Writes each message as a Markdown file into an outbox directory,
/// for pickup by whatever actually relays mail.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
    subject_prefix: String,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>, subject_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            subject_prefix: subject_prefix.into(),
        }
    }

    fn render(&self, recipients: &[Recipient], subject: &str, body: &str, attachment: Option<&Path>) -> String {
        let to = recipients
            .iter()
            .map(|r| {
                if r.name.is_empty() {
                    r.email.clone()
                } else {
                    format!("{} <{}>", r.name, r.email)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("to: {to}\n"));
        out.push_str(&format!(
            "subject: {}\n",
            prefixed_subject(&self.subject_prefix, subject)
        ));
        out.push_str(&format!("date: {}\n", Utc::now().to_rfc3339()));
        // Only attach files that still exist at send time.
        if let Some(path) = attachment.filter(|p| p.exists()) {
            out.push_str(&format!("attachment: {}\n", path.display()));
        }
        out.push_str("---\n\n");
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

impl Notifier for OutboxNotifier {
    #[instrument(skip_all, fields(dir = %self.dir.display(), recipients = recipients.len()))]
    async fn send(
        &self,
        recipients: &[Recipient],
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<()> {
        if recipients.is_empty() {
            return Err(TrendbriefError::Notify("no recipients configured".into()));
        }

        let message = self.render(recipients, subject, body, attachment);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TrendbriefError::io(&self.dir, e))?;
        let path = self.dir.join(format!("{}.md", RunId::new()));
        tokio::fs::write(&path, message)
            .await
            .map_err(|e| TrendbriefError::io(&path, e))?;

        info!(path = %path.display(), "briefing written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients() -> Vec<Recipient> {
        vec![
            Recipient {
                name: "Ana".into(),
                email: "ana@example.com".into(),
            },
            Recipient {
                name: String::new(),
                email: "desk@example.com".into(),
            },
        ]
    }

    #[test]
    fn subject_prefix_is_trimmed() {
        assert_eq!(
            prefixed_subject("[Investment Alert]", "BERT update"),
            "[Investment Alert] BERT update"
        );
        assert_eq!(prefixed_subject("", "BERT update"), "BERT update");
    }

    #[tokio::test]
    async fn writes_one_message_per_send() {
        let tmp = std::env::temp_dir().join(format!("tb-outbox-test-{}", uuid::Uuid::now_v7()));
        let notifier = OutboxNotifier::new(&tmp, "[Investment Alert]");

        notifier
            .send(&recipients(), "BERT update detected: weekly", "Overview\nAll good", None)
            .await
            .unwrap();
        notifier
            .send(&recipients(), "second", "body\n", None)
            .await
            .unwrap();

        let messages: Vec<String> = std::fs::read_dir(&tmp)
            .unwrap()
            .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
            .collect();
        assert_eq!(messages.len(), 2);

        let first = messages
            .iter()
            .find(|m| m.contains("weekly"))
            .unwrap();
        assert!(first.contains("to: Ana <ana@example.com>, desk@example.com\n"));
        assert!(first.contains("subject: [Investment Alert] BERT update detected: weekly\n"));
        assert!(first.ends_with("---\n\nOverview\nAll good\n"));
        assert!(!first.contains("attachment:"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn existing_attachment_is_referenced() {
        let tmp = std::env::temp_dir().join(format!("tb-outbox-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&tmp).unwrap();
        let chart = tmp.join("BERT_trend.json");
        std::fs::write(&chart, "{}").unwrap();

        let outbox = tmp.join("outbox");
        OutboxNotifier::new(&outbox, "")
            .send(&recipients(), "s", "b", Some(&chart))
            .await
            .unwrap();

        let file = std::fs::read_dir(&outbox).unwrap().next().unwrap().unwrap().path();
        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains(&format!("attachment: {}\n", chart.display())));
        assert!(text.contains("subject: s\n"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn no_recipients_is_an_error() {
        let tmp = std::env::temp_dir().join(format!("tb-outbox-test-{}", uuid::Uuid::now_v7()));
        let err = OutboxNotifier::new(&tmp, "x")
            .send(&[], "s", "b", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrendbriefError::Notify(_)));
        assert!(!tmp.exists());
    }
}
