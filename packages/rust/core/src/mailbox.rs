//! Monitored mailbox access.

use std::future::Future;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use trendbrief_shared::{IncomingEmail, Result, TrendbriefError};

/// Source of unseen mail.
pub trait Mailbox: Send + Sync {
    fn fetch_unseen(&self) -> impl Future<Output = Result<Vec<IncomingEmail>>> + Send;

    fn mark_as_read(&self, uid: &str) -> impl Future<Output = Result<()>> + Send;
}

/// On-disk message format; the uid comes from the file name.
#[derive(Debug, Deserialize)]
struct SpooledMessage {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    body: String,
}

/// A directory of `<uid>.json` messages. Reading a message renames it to
/// `<uid>.seen`.
#[derive(Debug, Clone)]
pub struct SpoolMailbox {
    dir: PathBuf,
}

impl SpoolMailbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn message_path(&self, uid: &str) -> PathBuf {
        self.dir.join(format!("{uid}.json"))
    }
}

impl Mailbox for SpoolMailbox {
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    async fn fetch_unseen(&self) -> Result<Vec<IncomingEmail>> {
        let mut reader = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| TrendbriefError::Mailbox(format!("{}: {e}", self.dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| TrendbriefError::Mailbox(format!("{}: {e}", self.dir.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut messages = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(uid) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| TrendbriefError::io(&path, e))?;
            match serde_json::from_str::<SpooledMessage>(&raw) {
                Ok(msg) => messages.push(IncomingEmail {
                    uid,
                    subject: msg.subject,
                    from_email: msg.from,
                    body: msg.body,
                }),
                // A malformed file stays unseen; it must not block the rest.
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed message"),
            }
        }

        debug!(unseen = messages.len(), "spool scanned");
        Ok(messages)
    }

    async fn mark_as_read(&self, uid: &str) -> Result<()> {
        let from = self.message_path(uid);
        let to = from.with_extension("seen");
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| TrendbriefError::Mailbox(format!("cannot mark {uid} as read: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spool() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tb-spool-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn fetches_json_messages_in_name_order() {
        let dir = spool();
        std::fs::write(
            dir.join("1002.json"),
            r#"{"subject":"second","from":"b@example.com","body":"two"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("1001.json"),
            r#"{"subject":"BERT weekly update","from":"desk@example.com","body":"one"}"#,
        )
        .unwrap();
        std::fs::write(dir.join("0999.seen"), "{}").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mailbox = SpoolMailbox::new(&dir);
        let unseen = mailbox.fetch_unseen().await.unwrap();
        let uids: Vec<_> = unseen.iter().map(|m| m.uid.as_str()).collect();
        assert_eq!(uids, vec!["1001", "1002"]);
        assert_eq!(unseen[0].from_email, "desk@example.com");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn marking_read_hides_message() {
        let dir = spool();
        std::fs::write(dir.join("7.json"), r#"{"subject":"s"}"#).unwrap();

        let mailbox = SpoolMailbox::new(&dir);
        mailbox.mark_as_read("7").await.unwrap();
        assert!(dir.join("7.seen").exists());
        assert!(mailbox.fetch_unseen().await.unwrap().is_empty());

        let err = mailbox.mark_as_read("7").await.unwrap_err();
        assert!(matches!(err, TrendbriefError::Mailbox(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn malformed_message_is_skipped() {
        let dir = spool();
        std::fs::write(dir.join("1.json"), "{not json").unwrap();
        std::fs::write(dir.join("2.json"), r#"{"subject":"ok"}"#).unwrap();

        let unseen = SpoolMailbox::new(&dir).fetch_unseen().await.unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].uid, "2");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_spool_is_mailbox_error() {
        let dir = std::env::temp_dir().join("tb-spool-definitely-missing");
        let err = SpoolMailbox::new(dir).fetch_unseen().await.unwrap_err();
        assert!(matches!(err, TrendbriefError::Mailbox(_)));
    }
}
