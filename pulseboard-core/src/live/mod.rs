//! Live response metrics.
//!
//! [`LiveAnalytics`] keeps a small per-survey snapshot of recent activity
//! and refreshes it whenever the application's change feed reports a new or
//! updated response. It deliberately does not maintain running counters:
//! every event triggers a bounded re-query of the activity window (default
//! 5 minutes) and a full recompute of [`RealTimeMetrics`] from that window.
//! At survey volumes this is simpler than incremental deltas and immune to
//! drift; the trade-off is one source query per event, with no coalescing.
//!
//! ## Wiring
//!
//! The backing store and the push transport are external collaborators
//! reached through [`ResponseSource`] and [`ChangeFeed`]. The application
//! glue registers the feed, translates its notifications into
//! [`ChangeEvent`]s, and calls [`LiveAnalytics::handle_event`]. Subscriber
//! callbacks receive each discrete [`AnalyticsUpdate`] together with the
//! refreshed metrics snapshot.
//!
//! One feed registration exists per survey regardless of subscriber count;
//! it is reference-counted and torn down when the last subscriber leaves.
//!
//! Recompute-then-publish is not atomic on its own, so each survey owns a
//! serialization lock held from the window query through snapshot publish
//! and delivery. Concurrent `handle_event` calls for the same survey are
//! processed one at a time; a staler window can never overwrite a fresher
//! snapshot. There is no ordering across surveys. Callbacks run on the
//! calling thread and must not call back into the service.

pub mod reconnect;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RealtimeConfig;
use crate::error::Result;
use crate::types::{ResponseRecord, ResponseStatus};

/// Response ids surfaced in the `recent_responses` field of each snapshot.
const RECENT_RESPONSES_LIMIT: usize = 10;

// ============================================
// External collaborators
// ============================================

/// Query interface over the backing response store.
///
/// Implementations are expected to return responses created at or after
/// `since` for the given survey. The aggregator only ever asks for the
/// bounded activity window.
pub trait ResponseSource: Send + Sync {
    fn responses_since(
        &self,
        survey_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ResponseRecord>>;
}

/// Push-subscription registration with the realtime transport.
///
/// The transport itself (database replication stream, websocket, ...) is
/// out of scope; this trait only models registering interest per survey.
pub trait ChangeFeed: Send + Sync {
    fn register(&self, survey_id: &str) -> Result<()>;
    fn unregister(&self, survey_id: &str);
}

/// Operation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Table the change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Responses,
    Answers,
}

/// A single change-feed notification, already resolved to a survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Survey the changed row belongs to
    pub survey_id: String,
    /// Table the change applies to
    pub table: ChangeTable,
    /// Operation on the row
    pub op: ChangeOp,
    /// Response the change concerns, when known
    pub response_id: Option<String>,
}

impl ChangeEvent {
    /// The subscriber-facing update kind for this event.
    ///
    /// Answer-level changes surface as response updates: the response row
    /// is what subscribers track.
    pub fn update_kind(&self) -> UpdateKind {
        match (self.table, self.op) {
            (ChangeTable::Responses, ChangeOp::Insert) => UpdateKind::ResponseCreated,
            (ChangeTable::Responses, ChangeOp::Delete) => UpdateKind::ResponseDeleted,
            (ChangeTable::Responses, ChangeOp::Update) => UpdateKind::ResponseUpdated,
            (ChangeTable::Answers, _) => UpdateKind::ResponseUpdated,
        }
    }
}

// ============================================
// Subscriber-facing outputs
// ============================================

/// Kind of discrete update pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    ResponseCreated,
    ResponseUpdated,
    ResponseDeleted,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::ResponseCreated => "response_created",
            UpdateKind::ResponseUpdated => "response_updated",
            UpdateKind::ResponseDeleted => "response_deleted",
        }
    }
}

/// A discrete activity event, retained briefly for activity-feed display.
///
/// Not authoritative state: the ring buffer holding these is bounded and
/// swept, and the metrics snapshot is always recomputed from the source.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsUpdate {
    /// Survey the update belongs to
    pub survey_id: String,
    /// What happened
    pub kind: UpdateKind,
    /// Response concerned, when known
    pub response_id: Option<String>,
    /// When the aggregator processed the event
    pub timestamp: DateTime<Utc>,
}

/// Window-bounded metrics snapshot for one survey.
///
/// Recomputed from the activity window on every event, not patched
/// incrementally. Lifecycle matches the subscription: the snapshot is
/// dropped when the last subscriber for the survey leaves.
#[derive(Debug, Clone, Serialize)]
pub struct RealTimeMetrics {
    /// Survey these numbers describe
    pub survey_id: String,
    /// Responses created within the activity window
    pub response_count: usize,
    /// In-progress responses young enough to count as live respondents
    pub active_respondents: usize,
    /// Completed / window responses, as a percentage in [0, 100]
    pub completion_rate: f64,
    /// Newest response creation time in the window
    pub last_response_time: Option<DateTime<Utc>>,
    /// Most recent response ids in the window, newest first, bounded
    pub recent_responses: Vec<String>,
}

/// Handle identifying one subscriber registration.
pub type SubscriptionId = Uuid;

/// Callback invoked with each update and the refreshed snapshot.
pub type UpdateCallback = Arc<dyn Fn(&AnalyticsUpdate, &RealTimeMetrics) + Send + Sync>;

// ============================================
// Service
// ============================================

struct Subscriber {
    survey_id: String,
    callback: UpdateCallback,
}

struct SurveyEntry {
    subscriber_count: usize,
    metrics: Option<RealTimeMetrics>,
}

#[derive(Default)]
struct LiveState {
    subscribers: HashMap<SubscriptionId, Subscriber>,
    surveys: HashMap<String, SurveyEntry>,
    activity: HashMap<String, VecDeque<AnalyticsUpdate>>,
}

/// Live metrics service.
///
/// Explicitly constructed and dependency-injected; the application's
/// composition root owns one instance for the process (or one per test).
pub struct LiveAnalytics {
    source: Arc<dyn ResponseSource>,
    feed: Arc<dyn ChangeFeed>,
    config: RealtimeConfig,
    state: Mutex<LiveState>,
    /// Per-survey serialization locks for recompute-then-publish.
    recompute: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LiveAnalytics {
    pub fn new(
        source: Arc<dyn ResponseSource>,
        feed: Arc<dyn ChangeFeed>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            source,
            feed,
            config,
            state: Mutex::new(LiveState::default()),
            recompute: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Subscribe to a survey's live updates.
    ///
    /// The first subscriber for a survey registers the underlying feed;
    /// later subscribers share that registration.
    pub fn subscribe(&self, survey_id: &str, callback: UpdateCallback) -> Result<SubscriptionId> {
        let mut state = self.state.lock();

        if !state.surveys.contains_key(survey_id) {
            self.feed.register(survey_id)?;
            tracing::info!(survey_id = %survey_id, "Registered change feed for survey");
        }

        let id = Uuid::new_v4();
        state.subscribers.insert(
            id,
            Subscriber {
                survey_id: survey_id.to_string(),
                callback,
            },
        );
        let entry = state
            .surveys
            .entry(survey_id.to_string())
            .or_insert(SurveyEntry {
                subscriber_count: 0,
                metrics: None,
            });
        entry.subscriber_count += 1;

        tracing::debug!(
            survey_id = %survey_id,
            subscription_id = %id,
            subscribers = entry.subscriber_count,
            "Added live subscriber"
        );

        Ok(id)
    }

    /// Remove a subscriber.
    ///
    /// The last subscriber for a survey tears down the feed registration
    /// and drops the survey's snapshot and activity buffer. Returns false
    /// when the id is unknown (already unsubscribed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let torn_down = {
            let mut state = self.state.lock();

            let Some(subscriber) = state.subscribers.remove(&id) else {
                tracing::warn!(subscription_id = %id, "Unsubscribe for unknown subscription");
                return false;
            };

            let survey_id = subscriber.survey_id;
            let remaining = match state.surveys.get_mut(&survey_id) {
                Some(entry) => {
                    entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
                    entry.subscriber_count
                }
                None => 0,
            };

            if remaining == 0 {
                state.surveys.remove(&survey_id);
                state.activity.remove(&survey_id);
                Some(survey_id)
            } else {
                None
            }
        };

        if let Some(survey_id) = torn_down {
            self.recompute.lock().remove(&survey_id);
            self.feed.unregister(&survey_id);
            tracing::info!(survey_id = %survey_id, "Tore down change feed for survey");
        }

        true
    }

    /// Whether a feed registration is currently held for a survey.
    pub fn feed_active(&self, survey_id: &str) -> bool {
        self.state.lock().surveys.contains_key(survey_id)
    }

    /// Current metrics snapshot, if any event has been processed.
    pub fn metrics(&self, survey_id: &str) -> Option<RealTimeMetrics> {
        self.state
            .lock()
            .surveys
            .get(survey_id)
            .and_then(|entry| entry.metrics.clone())
    }

    /// Buffered recent activity for a survey, oldest first.
    pub fn recent_activity(&self, survey_id: &str) -> Vec<AnalyticsUpdate> {
        self.state
            .lock()
            .activity
            .get(survey_id)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Process one change-feed notification.
    ///
    /// Re-queries the activity window, recomputes the survey's snapshot,
    /// appends the update to the activity ring, and notifies every
    /// subscriber. The survey's serialization lock is held across all of
    /// this, so concurrent events for one survey publish in query order.
    /// A failed re-query is logged and leaves the previous snapshot
    /// current; a panicking callback is caught and logged without
    /// affecting other subscribers.
    pub fn handle_event(&self, event: &ChangeEvent) {
        if !self.feed_active(&event.survey_id) {
            tracing::debug!(survey_id = %event.survey_id, "Event for survey with no subscribers");
            return;
        }

        let survey_lock = {
            let mut locks = self.recompute.lock();
            locks.entry(event.survey_id.clone()).or_default().clone()
        };
        let _serialized = survey_lock.lock();

        let now = Utc::now();
        let since = now - Duration::seconds(self.config.activity_window_secs);
        let responses = match self.source.responses_since(&event.survey_id, since) {
            Ok(responses) => responses,
            Err(e) => {
                tracing::warn!(
                    survey_id = %event.survey_id,
                    error = %e,
                    "Window re-query failed; keeping previous metrics snapshot"
                );
                return;
            }
        };

        let metrics = compute_window_metrics(&event.survey_id, &responses, now, &self.config);
        let update = AnalyticsUpdate {
            survey_id: event.survey_id.clone(),
            kind: event.update_kind(),
            response_id: event.response_id.clone(),
            timestamp: now,
        };

        let callbacks: Vec<UpdateCallback> = {
            let mut state = self.state.lock();

            // The last subscriber may have left while we were querying.
            let Some(entry) = state.surveys.get_mut(&event.survey_id) else {
                return;
            };
            entry.metrics = Some(metrics.clone());

            let buffer = state
                .activity
                .entry(event.survey_id.clone())
                .or_insert_with(|| VecDeque::with_capacity(self.config.activity_buffer_size));
            if buffer.len() == self.config.activity_buffer_size {
                buffer.pop_front();
            }
            buffer.push_back(update.clone());

            state
                .subscribers
                .values()
                .filter(|s| s.survey_id == event.survey_id)
                .map(|s| s.callback.clone())
                .collect()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&update, &metrics))).is_err() {
                tracing::error!(
                    survey_id = %event.survey_id,
                    kind = update.kind.as_str(),
                    "Subscriber callback panicked; other subscribers unaffected"
                );
            }
        }
    }

    /// Prune activity entries older than the activity window, dropping a
    /// survey's buffer entirely once empty.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.config.activity_window_secs);
        let mut state = self.state.lock();
        let mut pruned = 0usize;

        state.activity.retain(|_, buffer| {
            while buffer
                .front()
                .map(|update| update.timestamp < cutoff)
                .unwrap_or(false)
            {
                buffer.pop_front();
                pruned += 1;
            }
            !buffer.is_empty()
        });

        if pruned > 0 {
            tracing::debug!(pruned, "Swept expired activity entries");
        }
    }

    /// Run the housekeeping sweep on an interval until the task is aborted.
    pub async fn run_sweeper(self: Arc<Self>) {
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.sweep(Utc::now());
        }
    }
}

/// Recompute a survey's snapshot from the responses in its activity window.
fn compute_window_metrics(
    survey_id: &str,
    responses: &[ResponseRecord],
    now: DateTime<Utc>,
    config: &RealtimeConfig,
) -> RealTimeMetrics {
    let response_count = responses.len();
    let completed = responses.iter().filter(|r| r.is_completed()).count();
    let completion_rate = if response_count > 0 {
        (completed as f64 / response_count as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let active_cutoff = now - Duration::seconds(config.active_respondent_window_secs);
    let active_respondents = responses
        .iter()
        .filter(|r| r.status == ResponseStatus::InProgress && r.created_at >= active_cutoff)
        .count();

    let last_response_time = responses.iter().map(|r| r.created_at).max();

    let mut ordered: Vec<&ResponseRecord> = responses.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_responses = ordered
        .iter()
        .take(RECENT_RESPONSES_LIMIT)
        .map(|r| r.id.clone())
        .collect();

    RealTimeMetrics {
        survey_id: survey_id.to_string(),
        response_count,
        active_respondents,
        completion_rate,
        last_response_time,
        recent_responses,
    }
}
