//! Domain types for the assessment lifecycle.
//!
//! Wire field names follow the shapes the deployed AI endpoints and the
//! existing database rows already use (`chat_history`, `rangeOfMotion`,
//! `possible_diagnosis`), so renames here are breaking changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Started,
    InProgress,
    Completed,
    Abandoned,
}

impl AssessmentStatus {
    /// Whether `next` is a legal transition from this status.
    ///
    /// Same-status updates are accepted so that client retries stay
    /// idempotent. `Completed` and `Abandoned` are terminal.
    pub fn can_transition_to(self, next: AssessmentStatus) -> bool {
        use AssessmentStatus::*;
        if self == next {
            return true;
        }
        match self {
            Started => matches!(next, InProgress | Abandoned),
            InProgress => matches!(next, Completed | Abandoned),
            Completed | Abandoned => false,
        }
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssessmentStatus::Started => write!(f, "started"),
            AssessmentStatus::InProgress => write!(f, "in_progress"),
            AssessmentStatus::Completed => write!(f, "completed"),
            AssessmentStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for AssessmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "started" => Ok(AssessmentStatus::Started),
            "in_progress" => Ok(AssessmentStatus::InProgress),
            "completed" => Ok(AssessmentStatus::Completed),
            "abandoned" => Ok(AssessmentStatus::Abandoned),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// One turn of the conversational intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// One turn of the structured questionnaire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTurn {
    pub user: String,
    pub assistant: String,
}

/// A range-of-motion measurement pair.
///
/// Minimum and maximum are decimal strings, never floats: readings round-trip
/// through storage and the dashboard request byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOfMotion {
    pub minimum: String,
    pub maximum: String,
}

/// An assessment as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub assessment_id: i64,
    pub user_id: i64,
    pub anatomy_id: i64,
    pub assessment_type: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: AssessmentStatus,
    pub completion_percentage: f64,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// Outbound payload for the chat endpoint; also the document written into
/// `assessments.chat_history` when the conversation reaches a decision point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub chat_history: Vec<ChatTurn>,
}

/// Outbound payload for the questionnaire endpoint; also the snapshot
/// appended to `questionnaires`. `video` carries an optional reference used
/// upstream for body-part identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub chat_history: Vec<QuestionTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

/// The aggregated data sent to the diagnostic AI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub chat_history: Vec<QuestionTurn>,
    #[serde(rename = "rangeOfMotion")]
    pub range_of_motion: RangeOfMotion,
}

/// Diagnostic summary produced by the AI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysisResult {
    pub symptoms: Vec<String>,
    pub possible_diagnosis: Vec<String>,
    pub next_steps: String,
}

/// Diagnostic summary plus the upstream's follow-up action hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResult {
    pub response: AiAnalysisResult,
    pub action: String,
}

/// A user row, owned by the account collaborator; read-only here
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}
