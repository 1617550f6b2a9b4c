//! Top-level assessment lifecycle operations.
//!
//! Creation, status transitions, and completion all go through here; the
//! routing layer composes these with the collectors and the dashboard
//! aggregator.

use crate::error::{Error, Result};
use crate::history::{self, DecodedHistory};
use crate::models::{Assessment, AssessmentStatus, ChatTurn};
use crate::store::{AssessmentRow, TriageDb};
use tracing::info;

/// Orchestrates assessment lifecycle operations against the store
#[derive(Clone)]
pub struct WorkflowController {
    db: TriageDb,
}

pub(crate) fn assessment_from_row(row: AssessmentRow) -> Result<Assessment> {
    let status: AssessmentStatus = row.status.parse()?;
    let decoded: DecodedHistory<ChatTurn> = history::decode_history(row.chat_history.as_deref());
    Ok(Assessment {
        assessment_id: row.assessment_id,
        user_id: row.user_id,
        anatomy_id: row.anatomy_id,
        assessment_type: row.assessment_type,
        start_time: row.start_time,
        end_time: row.end_time,
        status,
        completion_percentage: row.completion_percentage,
        chat_history: decoded.turns,
    })
}

impl WorkflowController {
    pub fn new(db: TriageDb) -> Self {
        Self { db }
    }

    /// Create a new assessment for an existing user.
    ///
    /// `anatomy_id` and `assessment_type` are recorded as given; only the
    /// user reference is verified.
    pub async fn create_assessment(
        &self,
        user_id: i64,
        anatomy_id: i64,
        assessment_type: &str,
    ) -> Result<Assessment> {
        if !self.db.user_exists(user_id).await? {
            return Err(Error::UserNotFound);
        }

        let row = self
            .db
            .insert_assessment(user_id, anatomy_id, assessment_type, AssessmentStatus::Started)
            .await?;
        info!(
            "created assessment {} for user {} (anatomy {}, type {})",
            row.assessment_id, user_id, anatomy_id, assessment_type
        );
        assessment_from_row(row)
    }

    /// Fetch an assessment with its chat history decoded.
    ///
    /// Historical rows in any shape decode to a turn list (possibly empty);
    /// only a missing row or a storage failure is an error.
    pub async fn get_assessment(&self, assessment_id: i64) -> Result<Assessment> {
        let row = self
            .db
            .get_assessment(assessment_id)
            .await?
            .ok_or(Error::AssessmentNotFound)?;
        assessment_from_row(row)
    }

    /// Update an assessment's status.
    ///
    /// The status string must name one of the four states and the change
    /// must be a legal transition (`started -> in_progress -> {completed,
    /// abandoned}`; repeating the current status is a no-op update).
    pub async fn update_status(&self, assessment_id: i64, status: &str) -> Result<()> {
        let next: AssessmentStatus = status.parse()?;

        let row = self
            .db
            .get_assessment(assessment_id)
            .await?
            .ok_or(Error::AssessmentNotFound)?;
        let current: AssessmentStatus = row.status.parse()?;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let affected = self.db.update_assessment_status(assessment_id, next).await?;
        if affected == 0 {
            return Err(Error::AssessmentNotFound);
        }
        info!("assessment {} status: {} -> {}", assessment_id, current, next);
        Ok(())
    }

    /// Mark an assessment completed: status `completed`, completion 100,
    /// end time now. Repeatable; not guarded by the transition rules, so a
    /// dashboard build retry can always converge on the terminal state.
    pub async fn complete_assessment(&self, assessment_id: i64) -> Result<()> {
        self.db.mark_assessment_complete(assessment_id).await?;
        info!("assessment {} marked complete", assessment_id);
        Ok(())
    }
}
