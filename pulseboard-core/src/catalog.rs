//! Metric catalog for discovery and documentation.

/// Type of metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValueType {
    Integer,
    Float,
    Timestamp,
    Series,
}

impl MetricValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricValueType::Integer => "integer",
            MetricValueType::Float => "float",
            MetricValueType::Timestamp => "timestamp",
            MetricValueType::Series => "series",
        }
    }
}

/// Descriptor for a derived metric surfaced by the analytics core.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    /// Module that produces the metric: "report" or "live"
    pub module: &'static str,
    pub name: &'static str,
    pub value_type: MetricValueType,
    pub summary: &'static str,
    pub description: &'static str,
}

const REPORT_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        module: "report",
        name: "completion_rate",
        value_type: MetricValueType::Float,
        summary: "Share of responses that finished the survey.",
        description: "Completed responses divided by total responses, as a percentage in [0, 100].",
    },
    MetricDescriptor {
        module: "report",
        name: "avg_completion_secs",
        value_type: MetricValueType::Float,
        summary: "Mean completion duration.",
        description: "Arithmetic mean of usable completion durations; non-positive and >= 1 hour durations are discarded. 0 means no usable data.",
    },
    MetricDescriptor {
        module: "report",
        name: "median_completion_secs",
        value_type: MetricValueType::Float,
        summary: "Median completion duration.",
        description: "Median of usable completion durations, averaging the two middle values on even-length input. 0 means no usable data.",
    },
    MetricDescriptor {
        module: "report",
        name: "response_velocity",
        value_type: MetricValueType::Float,
        summary: "Responses per day.",
        description: "Response count divided by the day span between the first and last response, never less than one day.",
    },
    MetricDescriptor {
        module: "report",
        name: "question_metrics",
        value_type: MetricValueType::Series,
        summary: "Per-question response and drop-off rates.",
        description: "One entry per schema question, in schema order. Drop-off compares adjacent-question answer counts.",
    },
    MetricDescriptor {
        module: "report",
        name: "trend",
        value_type: MetricValueType::Series,
        summary: "Daily response counts.",
        description: "One zero-filled entry per calendar day in the trend window, ending today.",
    },
    MetricDescriptor {
        module: "report",
        name: "devices",
        value_type: MetricValueType::Series,
        summary: "Responses by device family.",
        description: "Mobile/desktop/tablet/unknown counts from user-agent classification; buckets partition the response set.",
    },
    MetricDescriptor {
        module: "report",
        name: "drop_off",
        value_type: MetricValueType::Series,
        summary: "Cumulative drop-off per question.",
        description: "Reached counts requiring non-empty answers for every prior question, with per-question loss rates.",
    },
    MetricDescriptor {
        module: "report",
        name: "time_distribution",
        value_type: MetricValueType::Series,
        summary: "Completion-duration histogram.",
        description: "Counts over five fixed bands: <60s, 60-180s, 180-300s, 300-600s, >600s.",
    },
];

const LIVE_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        module: "live",
        name: "response_count",
        value_type: MetricValueType::Integer,
        summary: "Responses in the activity window.",
        description: "Responses created within the rolling activity window (default 5 minutes).",
    },
    MetricDescriptor {
        module: "live",
        name: "active_respondents",
        value_type: MetricValueType::Integer,
        summary: "Respondents currently answering.",
        description: "In-progress responses created within the active-respondent window (default 10 minutes).",
    },
    MetricDescriptor {
        module: "live",
        name: "completion_rate",
        value_type: MetricValueType::Float,
        summary: "Window completion rate.",
        description: "Completed responses divided by window responses, as a percentage; 0 on an empty window.",
    },
    MetricDescriptor {
        module: "live",
        name: "last_response_time",
        value_type: MetricValueType::Timestamp,
        summary: "Newest response in the window.",
        description: "Creation time of the most recent response in the activity window.",
    },
];

/// List all registered metrics.
pub fn list_metrics() -> Vec<MetricDescriptor> {
    REPORT_METRICS.iter().chain(LIVE_METRICS).cloned().collect()
}

/// List metrics for a given module name.
pub fn list_metrics_for_module(module: &str) -> Vec<MetricDescriptor> {
    list_metrics()
        .into_iter()
        .filter(|m| m.module == module)
        .collect()
}
