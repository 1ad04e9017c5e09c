//! Integration tests for the pulseboard analytics core
//!
//! These tests drive the batch analyzer and the live aggregator together
//! against an in-memory response source, the way the application glue
//! wires them in production.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use pulseboard_core::config::{AnalyzerConfig, RealtimeConfig};
use pulseboard_core::live::{
    ChangeEvent, ChangeFeed, ChangeOp, ChangeTable, LiveAnalytics, ResponseSource, UpdateCallback,
    UpdateKind,
};
use pulseboard_core::types::{
    AnswerValue, Question, QuestionType, ResponseRecord, ResponseStatus, SurveySchema,
};
use pulseboard_core::{ResponseAnalyzer, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================
// Fixtures
// ============================================

fn make_schema(survey_id: &str, question_ids: &[&str]) -> SurveySchema {
    SurveySchema {
        id: survey_id.to_string(),
        questions: question_ids
            .iter()
            .map(|id| Question {
                id: id.to_string(),
                question_type: QuestionType::Text,
                required: false,
                settings: serde_json::json!({}),
            })
            .collect(),
        metadata: serde_json::json!({}),
    }
}

struct ResponseBuilder {
    record: ResponseRecord,
}

impl ResponseBuilder {
    fn new(id: &str, survey_id: &str) -> Self {
        Self {
            record: ResponseRecord {
                id: id.to_string(),
                survey_id: survey_id.to_string(),
                status: ResponseStatus::Completed,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                submitted_at: None,
                time_spent_secs: None,
                user_agent: None,
                answers: HashMap::new(),
                metadata: serde_json::json!({}),
            },
        }
    }

    fn status(mut self, status: ResponseStatus) -> Self {
        self.record.status = status;
        self
    }

    fn created_secs_ago(mut self, secs: i64) -> Self {
        self.record.created_at = Utc::now() - Duration::seconds(secs);
        self
    }

    fn time_spent(mut self, secs: f64) -> Self {
        self.record.time_spent_secs = Some(secs);
        self
    }

    fn user_agent(mut self, ua: &str) -> Self {
        self.record.user_agent = Some(ua.to_string());
        self
    }

    fn answer(mut self, question_id: &str, value: &str) -> Self {
        self.record.answers.insert(
            question_id.to_string(),
            AnswerValue::Text(value.to_string()),
        );
        self
    }

    fn build(self) -> ResponseRecord {
        self.record
    }
}

/// In-memory stand-in for the application's response store.
#[derive(Default)]
struct MemorySource {
    responses: Mutex<Vec<ResponseRecord>>,
}

impl MemorySource {
    fn insert(&self, response: ResponseRecord) {
        self.responses.lock().push(response);
    }
}

impl ResponseSource for MemorySource {
    fn responses_since(
        &self,
        survey_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ResponseRecord>> {
        Ok(self
            .responses
            .lock()
            .iter()
            .filter(|r| r.survey_id == survey_id && r.created_at >= since)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct CountingFeed {
    registered: AtomicUsize,
}

impl ChangeFeed for CountingFeed {
    fn register(&self, _survey_id: &str) -> Result<()> {
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&self, _survey_id: &str) {
        self.registered.fetch_sub(1, Ordering::SeqCst);
    }
}

fn insert_event(survey_id: &str, response_id: &str) -> ChangeEvent {
    ChangeEvent {
        survey_id: survey_id.to_string(),
        table: ChangeTable::Responses,
        op: ChangeOp::Insert,
        response_id: Some(response_id.to_string()),
    }
}

// ============================================
// Batch analyzer over realistic snapshots
// ============================================

#[test]
fn test_full_report_over_mixed_snapshot() {
    let schema = make_schema("nps-q3", &["score", "reason", "follow_up"]);
    let responses = vec![
        ResponseBuilder::new("r1", "nps-q3")
            .answer("score", "9")
            .answer("reason", "fast support")
            .answer("follow_up", "yes")
            .time_spent(95.0)
            .user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X)")
            .build(),
        ResponseBuilder::new("r2", "nps-q3")
            .answer("score", "7")
            .answer("reason", "pricing")
            .time_spent(240.0)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
            .build(),
        ResponseBuilder::new("r3", "nps-q3")
            .status(ResponseStatus::Abandoned)
            .answer("score", "4")
            .user_agent("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X)")
            .build(),
    ];

    let analyzer = ResponseAnalyzer::new(AnalyzerConfig::default());
    let analysis = analyzer.analyze(&schema, &responses);

    assert_eq!(analysis.total_responses, 3);
    assert_eq!(analysis.completed_responses, 2);
    assert!((analysis.completion_rate - 66.6667).abs() < 0.01);

    // Durations: 95 and 240 are usable, the abandoned response has none.
    assert_eq!(analysis.avg_completion_secs, 167.5);
    assert_eq!(analysis.median_completion_secs, 167.5);
    assert_eq!(analysis.time_distribution.one_to_3min, 1);
    assert_eq!(analysis.time_distribution.three_to_5min, 1);

    // Question metrics in schema order.
    let rates: Vec<f64> = analysis
        .question_metrics
        .iter()
        .map(|m| m.response_rate)
        .collect();
    assert_eq!(rates[0], 100.0);
    assert!((rates[1] - 66.6667).abs() < 0.01);
    assert!((rates[2] - 33.3333).abs() < 0.01);

    // Cumulative drop-off loses one response at each later question.
    assert_eq!(analysis.drop_off[0].reached, 3);
    assert_eq!(analysis.drop_off[1].reached, 2);
    assert_eq!(analysis.drop_off[2].reached, 1);
    assert_eq!(analysis.drop_off[2].drop_off_rate, 50.0);

    // One device per response, one bucket each.
    assert_eq!(analysis.devices.mobile, 1);
    assert_eq!(analysis.devices.desktop, 1);
    assert_eq!(analysis.devices.tablet, 1);
    assert_eq!(analysis.devices.total(), 3);

    // Trend covers the full window, with all three responses today.
    assert_eq!(analysis.trend.len(), 30);
    assert_eq!(analysis.trend.last().unwrap().responses, 3);
}

#[test]
fn test_report_serializes_for_transport() {
    let schema = make_schema("s1", &["q1"]);
    let responses = vec![ResponseBuilder::new("r1", "s1").answer("q1", "a").build()];
    let analysis = ResponseAnalyzer::new(AnalyzerConfig::default()).analyze(&schema, &responses);

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["survey_id"], "s1");
    assert_eq!(json["total_responses"], 1);
    assert!(json["question_metrics"].is_array());
}

// ============================================
// Live aggregator end to end
// ============================================

#[test]
fn test_live_flow_from_event_to_subscriber() {
    let source = Arc::new(MemorySource::default());
    let feed = Arc::new(CountingFeed::default());
    let live = LiveAnalytics::new(source.clone(), feed.clone(), RealtimeConfig::default());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: UpdateCallback = Arc::new(move |update, metrics| {
        sink.lock().push((update.kind, metrics.response_count));
    });
    let sub = live.subscribe("nps-q3", callback).unwrap();
    assert_eq!(feed.registered.load(Ordering::SeqCst), 1);

    source.insert(
        ResponseBuilder::new("r1", "nps-q3")
            .status(ResponseStatus::InProgress)
            .created_secs_ago(10)
            .build(),
    );
    live.handle_event(&insert_event("nps-q3", "r1"));

    source.insert(
        ResponseBuilder::new("r2", "nps-q3")
            .created_secs_ago(2)
            .build(),
    );
    live.handle_event(&insert_event("nps-q3", "r2"));

    {
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (UpdateKind::ResponseCreated, 1));
        assert_eq!(seen[1], (UpdateKind::ResponseCreated, 2));
    }

    let metrics = live.metrics("nps-q3").unwrap();
    assert_eq!(metrics.response_count, 2);
    assert_eq!(metrics.active_respondents, 1);
    assert_eq!(metrics.completion_rate, 50.0);
    assert_eq!(metrics.recent_responses[0], "r2");

    assert!(live.unsubscribe(sub));
    assert_eq!(feed.registered.load(Ordering::SeqCst), 0);
    assert!(live.metrics("nps-q3").is_none());
}

#[test]
fn test_live_surveys_are_isolated() {
    let source = Arc::new(MemorySource::default());
    let feed = Arc::new(CountingFeed::default());
    let live = LiveAnalytics::new(source.clone(), feed, RealtimeConfig::default());

    let a_hits = Arc::new(AtomicUsize::new(0));
    let a_sink = a_hits.clone();
    live.subscribe(
        "survey-a",
        Arc::new(move |_, _| {
            a_sink.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    let b_hits = Arc::new(AtomicUsize::new(0));
    let b_sink = b_hits.clone();
    live.subscribe(
        "survey-b",
        Arc::new(move |_, _| {
            b_sink.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    source.insert(ResponseBuilder::new("r1", "survey-a").build());
    live.handle_event(&insert_event("survey-a", "r1"));

    assert_eq!(a_hits.load(Ordering::SeqCst), 1);
    assert_eq!(b_hits.load(Ordering::SeqCst), 0);
    assert!(live.metrics("survey-b").is_none());
}

#[test]
fn test_batch_and_live_agree_on_completion_rate() {
    // Same window of data through both paths: the one-shot report and the
    // live recompute must tell the same story.
    let schema = make_schema("s1", &["q1"]);
    let responses = vec![
        ResponseBuilder::new("r1", "s1")
            .answer("q1", "a")
            .created_secs_ago(10)
            .build(),
        ResponseBuilder::new("r2", "s1")
            .status(ResponseStatus::InProgress)
            .created_secs_ago(20)
            .build(),
    ];

    let analysis = ResponseAnalyzer::new(AnalyzerConfig::default()).analyze(&schema, &responses);

    let source = Arc::new(MemorySource::default());
    for r in &responses {
        source.insert(r.clone());
    }
    let live = LiveAnalytics::new(
        source,
        Arc::new(CountingFeed::default()),
        RealtimeConfig::default(),
    );
    live.subscribe("s1", Arc::new(|_, _| {})).unwrap();
    live.handle_event(&insert_event("s1", "r2"));

    let metrics = live.metrics("s1").unwrap();
    assert_eq!(metrics.completion_rate, analysis.completion_rate);
    assert_eq!(metrics.response_count, analysis.total_responses);
}
