//! End-to-end briefing over the research fixtures with a mocked LLM endpoint.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use trendbrief_core::chart::JsonChartSink;
use trendbrief_core::llm::OpenAiSynthesizer;
use trendbrief_core::mailbox::{Mailbox, SpoolMailbox};
use trendbrief_core::monitor::{MonitorSettings, run_monitor};
use trendbrief_core::notify::OutboxNotifier;
use trendbrief_core::research::LocalResearchSource;
use trendbrief_core::workflow::BriefingWorkflow;
use trendbrief_shared::{ExtractionConfig, IncomingEmail, Recipient};

const FIXTURES: &str = "../../../fixtures";

fn scratch(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tb-{tag}-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

async fn mock_llm() -> wiremock::MockServer {
    let server = wiremock::MockServer::start().await;
    let synthesis = serde_json::json!({
        "summary": "Opinion recovered through February.",
        "key_points": ["Low of 0.31 mid-January", "0.72 on 2025-02-19"],
        "formatted_email": "Overview\nBERT sentiment is improving.\n\nContext\n...\n\nAction Items\n- Review position"
    });
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/responses"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "output_text": synthesis.to_string() }),
        ))
        .mount(&server)
        .await;
    server
}

fn trigger() -> IncomingEmail {
    let raw = std::fs::read_to_string(format!("{FIXTURES}/mail/update.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn briefing_over_fixture_research() {
    let server = mock_llm().await;
    let artifacts = scratch("artifacts");

    let workflow = BriefingWorkflow::new(
        LocalResearchSource::new(format!("{FIXTURES}/research"), 25),
        OpenAiSynthesizer::new(&server.uri(), "gpt-test", "sk-test", Duration::from_secs(5))
            .unwrap(),
        JsonChartSink::new(&artifacts),
        &ExtractionConfig::default(),
    )
    .unwrap();

    let out = workflow.run("BERT", &trigger()).await.unwrap();

    assert_eq!(out.subject, "BERT update detected: BERT weekly update");
    assert!(out.body.starts_with("Overview\n"));
    assert_eq!(out.key_points.len(), 2);
    assert_eq!(out.series.len(), 8);
    assert_eq!(out.series.scores().first(), Some(&0.40));
    assert_eq!(out.series.scores().last(), Some(&0.72));

    let chart = out.chart_path.unwrap();
    assert_eq!(chart, artifacts.join("BERT_trend.json"));
    let chart_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&chart).unwrap()).unwrap();
    assert_eq!(chart_json["points"].as_array().unwrap().len(), 8);
    assert_eq!(chart_json["points"][7]["date"], "2025-02-19T09:30:00");

    // The prompt carried the digest of every allowed file, and nothing else.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let input = body["input"].as_str().unwrap();
    assert!(input.contains("### File: history.csv\n"));
    assert!(input.contains("### File: notes.txt\n"));
    assert!(input.contains("### File: signal.json\n"));
    assert!(!input.contains("deck.pptx"));
    assert!(input.contains("Subject: BERT weekly update\nFrom: desk@example.com\n\n"));

    let _ = std::fs::remove_dir_all(&artifacts);
}

#[tokio::test]
async fn single_poll_briefs_spooled_mail() {
    let server = mock_llm().await;
    let root = scratch("watch");
    let spool = root.join("spool");
    let outbox = root.join("outbox");
    std::fs::create_dir_all(&spool).unwrap();
    std::fs::copy(format!("{FIXTURES}/mail/update.json"), spool.join("1001.json")).unwrap();
    std::fs::write(
        spool.join("1002.json"),
        r#"{"subject":"Albert lunch","from":"hr@example.com","body":"Friday"}"#,
    )
    .unwrap();

    let workflow = BriefingWorkflow::new(
        LocalResearchSource::new(format!("{FIXTURES}/research"), 25),
        OpenAiSynthesizer::new(&server.uri(), "gpt-test", "sk-test", Duration::from_secs(5))
            .unwrap(),
        JsonChartSink::new(root.join("artifacts")),
        &ExtractionConfig::default(),
    )
    .unwrap();
    let mailbox = SpoolMailbox::new(&spool);
    let notifier = OutboxNotifier::new(&outbox, "[Investment Alert]");
    let settings = MonitorSettings {
        keyword: "bert".into(),
        poll_interval: Duration::from_millis(1),
        recipients: vec![Recipient {
            name: "Desk".into(),
            email: "desk@example.com".into(),
        }],
        max_polls: Some(1),
    };
    let (_tx, rx) = watch::channel(false);

    let stats = run_monitor(&settings, &mailbox, &workflow, &notifier, rx)
        .await
        .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.briefings, 1);
    assert!(mailbox.fetch_unseen().await.unwrap().is_empty());
    assert!(spool.join("1001.seen").exists());

    let sent: Vec<_> = std::fs::read_dir(&outbox).unwrap().collect();
    assert_eq!(sent.len(), 1);
    let message = std::fs::read_to_string(sent[0].as_ref().unwrap().path()).unwrap();
    assert!(message.contains("subject: [Investment Alert] bert update detected: BERT weekly update\n"));
    assert!(message.contains("bert_trend.json"));

    let _ = std::fs::remove_dir_all(&root);
}
