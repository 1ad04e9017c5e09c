//! Core domain types for pulseboard
//!
//! These types form the canonical data model consumed by the analytics
//! core. They mirror the rows the surrounding application reads from its
//! backing store, but carry no persistence concerns themselves.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Survey** | An ordered list of Questions published to respondents |
//! | **Question** | A single prompt within a Survey; its shape depends on [`QuestionType`] |
//! | **Response** | One respondent's pass through a Survey, complete or not |
//! | **Answer** | The value a Response holds for one Question |
//! | **Completion** | A Response that reached the end of the Survey |
//! | **Drop-off** | A Response that stopped answering partway through |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Questions
// ============================================

/// Kind of question within a survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single-line free text
    Text,
    /// Multi-line free text
    Textarea,
    /// Pick one option
    SingleChoice,
    /// Pick any number of options
    MultipleChoice,
    /// Numeric rating scale
    Rating,
    /// Calendar date
    Date,
    /// Grid of rows x columns, one answer per row
    Matrix,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Rating => "rating",
            QuestionType::Date => "date",
            QuestionType::Matrix => "matrix",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(QuestionType::Text),
            "textarea" => Ok(QuestionType::Textarea),
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "rating" => Ok(QuestionType::Rating),
            "date" => Ok(QuestionType::Date),
            "matrix" => Ok(QuestionType::Matrix),
            _ => Err(format!("unknown question type: {}", s)),
        }
    }
}

/// A single question within a survey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the survey
    pub id: String,
    /// Kind of question
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Whether respondents must answer before advancing
    #[serde(default)]
    pub required: bool,
    /// Opaque per-type configuration (choices, scale bounds, matrix rows...)
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// An ordered survey definition.
///
/// Immutable input to the analyzer; question order here defines the order
/// of every per-question output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySchema {
    /// Unique identifier for this survey
    pub id: String,
    /// Questions in presentation order
    pub questions: Vec<Question>,
    /// Extensible metadata (title, owner, theme...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

// ============================================
// Answers
// ============================================

/// Answer value, polymorphic by question type.
///
/// Text, single-choice and date questions carry a string; multiple-choice
/// carries a list of selected options; rating carries a number; matrix
/// carries a row -> column map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
    Rating(f64),
    Matrix(HashMap<String, String>),
}

impl AnswerValue {
    /// An empty answer counts as skipped, not answered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.is_empty(),
            AnswerValue::Choices(options) => options.is_empty(),
            AnswerValue::Rating(_) => false,
            AnswerValue::Matrix(cells) => cells.is_empty(),
        }
    }
}

// ============================================
// Responses
// ============================================

/// Progress state of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Respondent reached the end of the survey
    Completed,
    /// Respondent is still answering
    InProgress,
    /// Respondent stopped without finishing
    Abandoned,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Completed => "completed",
            ResponseStatus::InProgress => "in_progress",
            ResponseStatus::Abandoned => "abandoned",
        }
    }
}

impl std::str::FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ResponseStatus::Completed),
            "in_progress" => Ok(ResponseStatus::InProgress),
            "abandoned" => Ok(ResponseStatus::Abandoned),
            _ => Err(format!("unknown response status: {}", s)),
        }
    }
}

/// One respondent's pass through a survey.
///
/// Timing and device fields are optional; the analytics core degrades to
/// zero/defaults when they are missing rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Unique identifier for this response
    pub id: String,
    /// Survey this response belongs to
    pub survey_id: String,
    /// Progress state
    pub status: ResponseStatus,
    /// When the response row was created
    pub created_at: DateTime<Utc>,
    /// When the respondent started answering
    pub started_at: Option<DateTime<Utc>>,
    /// When the respondent finished (if they did)
    pub completed_at: Option<DateTime<Utc>>,
    /// When the response was submitted (if submission is a separate step)
    pub submitted_at: Option<DateTime<Utc>>,
    /// Explicit completion duration in seconds, when the client reported one
    pub time_spent_secs: Option<f64>,
    /// Raw user-agent string from the respondent's browser
    pub user_agent: Option<String>,
    /// Answers keyed by question id
    #[serde(default)]
    pub answers: HashMap<String, AnswerValue>,
    /// Extensible metadata
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ResponseRecord {
    /// Whether this response counts as completed.
    ///
    /// A response is completed if its status says so or it carries a
    /// completion/submission timestamp.
    pub fn is_completed(&self) -> bool {
        self.status == ResponseStatus::Completed
            || self.completed_at.is_some()
            || self.submitted_at.is_some()
    }

    /// Completion duration in seconds, if derivable.
    ///
    /// Prefers the explicit `time_spent_secs` field, falling back to
    /// `completed_at - started_at`. Returns `None` when neither is
    /// available; callers apply their own outlier filtering.
    pub fn completion_secs(&self) -> Option<f64> {
        if let Some(spent) = self.time_spent_secs {
            return Some(spent);
        }
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => {
                Some(end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }

    /// Whether this response has a non-empty answer for a question.
    pub fn has_answered(&self, question_id: &str) -> bool {
        self.answers
            .get(question_id)
            .map(|answer| !answer.is_empty())
            .unwrap_or(false)
    }
}

// ============================================
// Devices
// ============================================

/// Device family a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Mobile,
    Desktop,
    Tablet,
    Unknown,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Mobile => "mobile",
            DeviceCategory::Desktop => "desktop",
            DeviceCategory::Tablet => "tablet",
            DeviceCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
