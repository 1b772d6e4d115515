//! Polling loop: watch the mailbox, brief on keyword hits.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use trendbrief_shared::{AppConfig, IncomingEmail, Recipient, Result};

use crate::chart::ChartSink;
use crate::keyword::KeywordMatcher;
use crate::llm::Synthesizer;
use crate::mailbox::Mailbox;
use crate::notify::Notifier;
use crate::research::ResearchSource;
use crate::workflow::BriefingWorkflow;

/// Loop parameters.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub keyword: String,
    pub poll_interval: Duration,
    pub recipients: Vec<Recipient>,
    /// Stop after this many polls; `None` runs until shutdown.
    pub max_polls: Option<u64>,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            keyword: config.keyword.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            recipients: config.recipients.clone(),
            max_polls: None,
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub polls: u64,
    /// Messages handled and marked read.
    pub processed: u64,
    /// Briefings delivered.
    pub briefings: u64,
    /// Messages whose handling failed; they stay unread.
    pub failures: u64,
    pub fetch_errors: u64,
}

/// Poll `mailbox` until `shutdown` flips to `true` (or `max_polls` is reached).
///
/// Each unseen message is checked for the keyword; hits run the workflow
/// and notify. A message is marked read only once it was fully handled.
/// Failures are logged and never stop the loop.
#[instrument(skip_all, fields(keyword = %settings.keyword))]
pub async fn run_monitor<M, N, R, S, C>(
    settings: &MonitorSettings,
    mailbox: &M,
    workflow: &BriefingWorkflow<R, S, C>,
    notifier: &N,
    mut shutdown: watch::Receiver<bool>,
) -> Result<MonitorStats>
where
    M: Mailbox,
    N: Notifier,
    R: ResearchSource,
    S: Synthesizer,
    C: ChartSink,
{
    let matcher = KeywordMatcher::new(&settings.keyword)?;
    let mut stats = MonitorStats::default();
    info!(interval_secs = settings.poll_interval.as_secs(), "starting monitor");

    loop {
        if *shutdown.borrow() {
            break;
        }
        stats.polls += 1;

        match mailbox.fetch_unseen().await {
            Ok(unseen) => {
                info!(count = unseen.len(), "fetched unseen mail");
                for email in &unseen {
                    if *shutdown.borrow() {
                        break;
                    }
                    match handle_email(&matcher, settings, mailbox, workflow, notifier, email).await
                    {
                        Ok(briefed) => {
                            stats.processed += 1;
                            if briefed {
                                stats.briefings += 1;
                            }
                        }
                        Err(e) => {
                            stats.failures += 1;
                            error!(uid = %email.uid, error = %e, "error processing email");
                        }
                    }
                }
            }
            Err(e) => {
                stats.fetch_errors += 1;
                error!(error = %e, "error fetching mail");
            }
        }

        if settings.max_polls.is_some_and(|max| stats.polls >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!("shutdown channel closed");
                    break;
                }
            }
        }
    }

    info!(
        polls = stats.polls,
        processed = stats.processed,
        briefings = stats.briefings,
        failures = stats.failures,
        "monitor stopped"
    );
    Ok(stats)
}

/// Returns whether a briefing was sent.
async fn handle_email<M, N, R, S, C>(
    matcher: &KeywordMatcher,
    settings: &MonitorSettings,
    mailbox: &M,
    workflow: &BriefingWorkflow<R, S, C>,
    notifier: &N,
    email: &IncomingEmail,
) -> Result<bool>
where
    M: Mailbox,
    N: Notifier,
    R: ResearchSource,
    S: Synthesizer,
    C: ChartSink,
{
    let hit = matcher.matches(email);
    if hit {
        info!(uid = %email.uid, keyword = matcher.keyword(), "keyword detected");
        let output = workflow.run(matcher.keyword(), email).await?;
        notifier
            .send(
                &settings.recipients,
                &output.subject,
                &output.body,
                output.chart_path.as_deref(),
            )
            .await?;
        info!(uid = %email.uid, run_id = %output.run_id, "notification sent");
    }

    mailbox.mark_as_read(&email.uid).await?;
    Ok(hit)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use trendbrief_shared::{Document, ExtractionConfig, TrendbriefError};

    use super::*;
    use crate::workflow::tests::{
        CountingChart, FailingSynthesizer, RecordingSynthesizer, StaticSource,
    };

    #[derive(Default)]
    struct MemoryMailbox {
        unseen: Mutex<Vec<IncomingEmail>>,
        read: Mutex<Vec<String>>,
        fail_next_fetch: AtomicBool,
    }

    impl MemoryMailbox {
        fn with(messages: Vec<IncomingEmail>) -> Self {
            Self {
                unseen: Mutex::new(messages),
                ..Self::default()
            }
        }
    }

    impl Mailbox for MemoryMailbox {
        async fn fetch_unseen(&self) -> Result<Vec<IncomingEmail>> {
            if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
                return Err(TrendbriefError::Mailbox("connection reset".into()));
            }
            Ok(self.unseen.lock().unwrap().clone())
        }

        async fn mark_as_read(&self, uid: &str) -> Result<()> {
            self.unseen.lock().unwrap().retain(|m| m.uid != uid);
            self.read.lock().unwrap().push(uid.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryNotifier {
        sent: Mutex<Vec<(usize, String, Option<String>)>>,
    }

    impl Notifier for MemoryNotifier {
        async fn send(
            &self,
            recipients: &[Recipient],
            subject: &str,
            _body: &str,
            attachment: Option<&Path>,
        ) -> Result<()> {
            self.sent.lock().unwrap().push((
                recipients.len(),
                subject.to_string(),
                attachment.map(|p| p.display().to_string()),
            ));
            Ok(())
        }
    }

    fn mail(uid: &str, subject: &str) -> IncomingEmail {
        IncomingEmail {
            uid: uid.into(),
            subject: subject.into(),
            from_email: "desk@example.com".into(),
            body: String::new(),
        }
    }

    fn settings(max_polls: Option<u64>) -> MonitorSettings {
        MonitorSettings {
            keyword: "bert".into(),
            poll_interval: Duration::from_millis(1),
            recipients: vec![Recipient {
                name: "Ana".into(),
                email: "ana@example.com".into(),
            }],
            max_polls,
        }
    }

    fn scored_workflow() -> BriefingWorkflow<StaticSource, RecordingSynthesizer, CountingChart> {
        BriefingWorkflow::new(
            StaticSource(vec![Document::new("notes.txt", "2025-01-02 score: 0.6")]),
            RecordingSynthesizer::default(),
            CountingChart::default(),
            &ExtractionConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn briefs_on_keyword_and_marks_everything_read() {
        let mailbox = MemoryMailbox::with(vec![
            mail("1", "BERT weekly update"),
            mail("2", "albert status"),
        ]);
        let notifier = MemoryNotifier::default();
        let (_tx, rx) = watch::channel(false);

        let stats = run_monitor(&settings(Some(1)), &mailbox, &scored_workflow(), &notifier, rx)
            .await
            .unwrap();

        assert_eq!(stats.polls, 1);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.briefings, 1);
        assert_eq!(*mailbox.read.lock().unwrap(), vec!["1", "2"]);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1);
        assert_eq!(sent[0].1, "bert update detected: BERT weekly update");
        assert_eq!(sent[0].2.as_deref(), Some("artifacts/bert_trend.json"));
    }

    #[tokio::test]
    async fn failed_message_stays_unread_and_loop_continues() {
        let mailbox = MemoryMailbox::with(vec![mail("1", "BERT update"), mail("2", "other")]);
        let notifier = MemoryNotifier::default();
        let workflow = BriefingWorkflow::new(
            StaticSource(Vec::new()),
            FailingSynthesizer,
            CountingChart::default(),
            &ExtractionConfig::default(),
        )
        .unwrap();
        let (_tx, rx) = watch::channel(false);

        let stats = run_monitor(&settings(Some(2)), &mailbox, &workflow, &notifier, rx)
            .await
            .unwrap();

        assert_eq!(stats.polls, 2);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(*mailbox.read.lock().unwrap(), vec!["2"]);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_error_is_logged_and_retried() {
        let mailbox = MemoryMailbox::with(vec![mail("1", "BERT update")]);
        mailbox.fail_next_fetch.store(true, Ordering::SeqCst);
        let notifier = MemoryNotifier::default();
        let (_tx, rx) = watch::channel(false);

        let stats = run_monitor(&settings(Some(2)), &mailbox, &scored_workflow(), &notifier, rx)
            .await
            .unwrap();

        assert_eq!(stats.fetch_errors, 1);
        assert_eq!(stats.briefings, 1);
    }

    #[tokio::test]
    async fn shutdown_before_start_polls_nothing() {
        let mailbox = MemoryMailbox::with(vec![mail("1", "BERT update")]);
        let notifier = MemoryNotifier::default();
        let (_tx, rx) = watch::channel(true);

        let stats = run_monitor(&settings(None), &mailbox, &scored_workflow(), &notifier, rx)
            .await
            .unwrap();

        assert_eq!(stats, MonitorStats::default());
        assert!(mailbox.read.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_wait() {
        let mailbox = MemoryMailbox::default();
        let notifier = MemoryNotifier::default();
        let (tx, rx) = watch::channel(false);
        let mut long_wait = settings(None);
        long_wait.poll_interval = Duration::from_secs(3600);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            run_monitor(&long_wait, &mailbox, &scored_workflow(), &notifier, rx),
        )
        .await
        .expect("monitor should stop on shutdown")
        .unwrap();

        assert_eq!(stats.polls, 1);
    }

    #[tokio::test]
    async fn empty_keyword_is_rejected() {
        let mut bad = settings(Some(1));
        bad.keyword = String::new();
        let (_tx, rx) = watch::channel(false);
        let result = run_monitor(
            &bad,
            &MemoryMailbox::default(),
            &scored_workflow(),
            &MemoryNotifier::default(),
            rx,
        )
        .await;
        assert!(result.is_err());
    }
}
