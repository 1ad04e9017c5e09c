//! Batch response analysis.
//!
//! [`ResponseAnalyzer`] takes a survey definition and a full snapshot of its
//! response rows and derives a complete [`ResponseAnalysis`] in one pass:
//! completion rates, per-question metrics, daily trend series, device
//! breakdown, drop-off analysis, and a completion-time histogram.
//!
//! The analyzer is a pure transformation of in-memory data. It performs no
//! I/O, never errors, and is safe to call concurrently from independent call
//! sites. Missing or malformed optional fields degrade to zero/defaults.
//!
//! ## Two drop-off definitions
//!
//! Per-question [`QuestionMetric::drop_off_rate`] compares adjacent-question
//! answer counts, while [`DropOffPoint`] requires reachability through every
//! prior question. The two disagree on responses that skip a question and
//! answer a later one. Both are intentionally kept as distinct named outputs;
//! consumers pick the one matching their chart.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::device::{DeviceClassifier, KeywordClassifier};
use crate::stats;
use crate::types::{DeviceCategory, ResponseRecord, SurveySchema};

// ============================================
// Output value objects
// ============================================

/// Per-question statistics, in survey-question order.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionMetric {
    /// Question this metric describes
    pub question_id: String,
    /// Responses with a non-empty answer for this question
    pub answered: usize,
    /// Responses without one
    pub skipped: usize,
    /// answered / total responses, as a percentage in [0, 100]
    pub response_rate: f64,
    /// Share of respondents lost relative to the previous question,
    /// in [0, 100]. Adjacent-count definition; 0 for the first question.
    pub drop_off_rate: f64,
    /// Approximate seconds spent on this question: overall average
    /// completion time divided evenly across questions.
    pub avg_time_secs: f64,
}

/// One calendar day in the trend series.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    /// The day this point covers
    pub date: NaiveDate,
    /// Short display label, e.g. "Aug 25"
    pub label: String,
    /// Responses created on this day
    pub responses: usize,
}

/// Responses by device family.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceBreakdown {
    pub mobile: usize,
    pub desktop: usize,
    pub tablet: usize,
    pub unknown: usize,
}

impl DeviceBreakdown {
    fn record(&mut self, category: DeviceCategory) {
        match category {
            DeviceCategory::Mobile => self.mobile += 1,
            DeviceCategory::Desktop => self.desktop += 1,
            DeviceCategory::Tablet => self.tablet += 1,
            DeviceCategory::Unknown => self.unknown += 1,
        }
    }

    /// Total classified responses. Equals the response count: every
    /// response lands in exactly one bucket.
    pub fn total(&self) -> usize {
        self.mobile + self.desktop + self.tablet + self.unknown
    }
}

/// Cumulative drop-off at one question.
///
/// A response has "reached" question `i` only if it carries non-empty
/// answers for every question at indices `0..=i` in schema order.
#[derive(Debug, Clone, Serialize)]
pub struct DropOffPoint {
    /// Question this point describes
    pub question_id: String,
    /// Responses that reached this question
    pub reached: usize,
    /// Responses lost between the previous question and this one
    pub drop_off_count: usize,
    /// drop_off_count relative to the previous question's reached set,
    /// as a percentage in [0, 100]
    pub drop_off_rate: f64,
}

/// Histogram of completion durations over five fixed bands.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeDistribution {
    /// Under 60 seconds
    pub under_1min: usize,
    /// 60 to 180 seconds
    pub one_to_3min: usize,
    /// 180 to 300 seconds
    pub three_to_5min: usize,
    /// 300 to 600 seconds
    pub five_to_10min: usize,
    /// Over 600 seconds
    pub over_10min: usize,
}

impl TimeDistribution {
    fn record(&mut self, secs: f64) {
        if secs < 60.0 {
            self.under_1min += 1;
        } else if secs < 180.0 {
            self.one_to_3min += 1;
        } else if secs < 300.0 {
            self.three_to_5min += 1;
        } else if secs <= 600.0 {
            self.five_to_10min += 1;
        } else {
            self.over_10min += 1;
        }
    }

    /// Total bucketed durations (responses with a usable completion time).
    pub fn total(&self) -> usize {
        self.under_1min + self.one_to_3min + self.three_to_5min + self.five_to_10min
            + self.over_10min
    }
}

/// Complete analysis of a survey's responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseAnalysis {
    /// Survey these numbers describe
    pub survey_id: String,
    /// Total responses in the snapshot
    pub total_responses: usize,
    /// Responses that finished the survey
    pub completed_responses: usize,
    /// completed / total, as a percentage in [0, 100]
    pub completion_rate: f64,
    /// Mean completion duration in seconds (0 = no usable durations)
    pub avg_completion_secs: f64,
    /// Median completion duration in seconds (0 = no usable durations)
    pub median_completion_secs: f64,
    /// Responses per day between the first and last response
    pub response_velocity: f64,
    /// One entry per schema question, in schema order
    pub question_metrics: Vec<QuestionMetric>,
    /// One entry per calendar day in the trend window, zero-filled
    pub trend: Vec<TrendPoint>,
    /// Device family breakdown
    pub devices: DeviceBreakdown,
    /// Cumulative drop-off, one entry per schema question
    pub drop_off: Vec<DropOffPoint>,
    /// Completion-time histogram
    pub time_distribution: TimeDistribution,
}

impl ResponseAnalysis {
    /// Format the average completion time for display (e.g., "2m 05s").
    pub fn avg_completion_display(&self) -> String {
        format_secs(self.avg_completion_secs)
    }

    /// Format the median completion time for display.
    pub fn median_completion_display(&self) -> String {
        format_secs(self.median_completion_secs)
    }
}

fn format_secs(secs: f64) -> String {
    let total = secs.round() as i64;
    let mins = total / 60;
    let rem = total % 60;
    if mins > 0 {
        format!("{}m {:02}s", mins, rem)
    } else {
        format!("{}s", rem)
    }
}

fn clamp_rate(rate: f64) -> f64 {
    rate.clamp(0.0, 100.0)
}

// ============================================
// Analyzer
// ============================================

/// Derives [`ResponseAnalysis`] summaries from response snapshots.
pub struct ResponseAnalyzer {
    config: AnalyzerConfig,
    classifier: Box<dyn DeviceClassifier>,
}

impl ResponseAnalyzer {
    /// Create an analyzer with the default keyword device classifier.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_classifier(config, Box::new(KeywordClassifier::new()))
    }

    /// Create an analyzer with a custom device classifier.
    pub fn with_classifier(config: AnalyzerConfig, classifier: Box<dyn DeviceClassifier>) -> Self {
        Self { config, classifier }
    }

    /// Analyze a full response snapshot, ending the trend window today.
    pub fn analyze(&self, schema: &SurveySchema, responses: &[ResponseRecord]) -> ResponseAnalysis {
        self.analyze_at(schema, responses, Utc::now())
    }

    /// Analyze with an injected clock.
    ///
    /// `now` only anchors the end of the trend window; callers that need
    /// byte-identical output across runs pass a fixed timestamp.
    pub fn analyze_at(
        &self,
        schema: &SurveySchema,
        responses: &[ResponseRecord],
        now: DateTime<Utc>,
    ) -> ResponseAnalysis {
        let total = responses.len();
        let completed = responses.iter().filter(|r| r.is_completed()).count();
        let completion_rate = if total > 0 {
            clamp_rate(completed as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        let durations = self.completion_durations(responses);
        let avg_completion_secs = stats::mean(&durations);
        let median_completion_secs = stats::median(&durations);

        let question_metrics = self.question_metrics(schema, responses, avg_completion_secs);

        tracing::debug!(
            survey_id = %schema.id,
            total,
            completed,
            usable_durations = durations.len(),
            "Analyzed response snapshot"
        );

        ResponseAnalysis {
            survey_id: schema.id.clone(),
            total_responses: total,
            completed_responses: completed,
            completion_rate,
            avg_completion_secs,
            median_completion_secs,
            response_velocity: response_velocity(responses),
            question_metrics,
            trend: self.trend(responses, now),
            devices: self.devices(responses),
            drop_off: drop_off_analysis(schema, responses),
            time_distribution: self.time_distribution(&durations),
        }
    }

    /// Usable completion durations: non-positive values and values at or
    /// above the outlier cutoff are discarded as noise.
    fn completion_durations(&self, responses: &[ResponseRecord]) -> Vec<f64> {
        responses
            .iter()
            .filter_map(|r| r.completion_secs())
            .filter(|&secs| secs > 0.0 && secs < self.config.max_completion_secs)
            .collect()
    }

    fn question_metrics(
        &self,
        schema: &SurveySchema,
        responses: &[ResponseRecord],
        avg_completion_secs: f64,
    ) -> Vec<QuestionMetric> {
        let total = responses.len();
        let question_count = schema.questions.len();
        let avg_time_secs = if question_count > 0 {
            avg_completion_secs / question_count as f64
        } else {
            0.0
        };

        let answered_counts: Vec<usize> = schema
            .questions
            .iter()
            .map(|q| responses.iter().filter(|r| r.has_answered(&q.id)).count())
            .collect();

        schema
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let answered = answered_counts[i];
                let response_rate = if total > 0 {
                    clamp_rate(answered as f64 / total as f64 * 100.0)
                } else {
                    0.0
                };

                // Adjacent-count drop-off: how many fewer answered this
                // question than the one before it.
                let drop_off_rate = if i == 0 {
                    0.0
                } else {
                    let prev = answered_counts[i - 1];
                    if prev > 0 {
                        clamp_rate((prev as f64 - answered as f64) / prev as f64 * 100.0)
                    } else {
                        0.0
                    }
                };

                QuestionMetric {
                    question_id: question.id.clone(),
                    answered,
                    skipped: total - answered,
                    response_rate,
                    drop_off_rate,
                    avg_time_secs,
                }
            })
            .collect()
    }

    /// Daily response counts for the most recent `trend_window_days`
    /// calendar days, including today, zero-filled.
    fn trend(&self, responses: &[ResponseRecord], now: DateTime<Utc>) -> Vec<TrendPoint> {
        let today = now.date_naive();
        (0..self.config.trend_window_days as i64)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                let count = responses
                    .iter()
                    .filter(|r| r.created_at.date_naive() == date)
                    .count();
                TrendPoint {
                    date,
                    label: date.format("%b %d").to_string(),
                    responses: count,
                }
            })
            .collect()
    }

    fn devices(&self, responses: &[ResponseRecord]) -> DeviceBreakdown {
        let mut breakdown = DeviceBreakdown::default();
        for response in responses {
            let category = response
                .user_agent
                .as_deref()
                .map(|ua| self.classifier.classify(ua))
                .unwrap_or(DeviceCategory::Unknown);
            breakdown.record(category);
        }
        breakdown
    }

    fn time_distribution(&self, durations: &[f64]) -> TimeDistribution {
        let mut distribution = TimeDistribution::default();
        for &secs in durations {
            distribution.record(secs);
        }
        distribution
    }
}

/// Responses per day across the span from first to last response.
///
/// A single response spans zero days and yields velocity 1.
fn response_velocity(responses: &[ResponseRecord]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }

    let first = responses.iter().map(|r| r.created_at).min().unwrap();
    let last = responses.iter().map(|r| r.created_at).max().unwrap();
    let days = (last.date_naive() - first.date_naive()).num_days().max(1);

    responses.len() as f64 / days as f64
}

/// Cumulative drop-off: a response counts toward question `i`'s reached set
/// only if it answered every question at indices `0..=i`. reached(-1) is the
/// full response set.
fn drop_off_analysis(schema: &SurveySchema, responses: &[ResponseRecord]) -> Vec<DropOffPoint> {
    // Consecutive-answer depth per response: number of questions answered
    // from the start before the first gap.
    let depths: Vec<usize> = responses
        .iter()
        .map(|r| {
            schema
                .questions
                .iter()
                .take_while(|q| r.has_answered(&q.id))
                .count()
        })
        .collect();

    let mut previous_reached = responses.len();
    schema
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let reached = depths.iter().filter(|&&depth| depth > i).count();
            let dropped = previous_reached.saturating_sub(reached);
            let drop_off_rate = if previous_reached > 0 {
                clamp_rate(dropped as f64 / previous_reached as f64 * 100.0)
            } else {
                0.0
            };

            let point = DropOffPoint {
                question_id: question.id.clone(),
                reached,
                drop_off_count: dropped,
                drop_off_rate,
            };
            previous_reached = reached;
            point
        })
        .collect()
}
