//! Dashboard aggregation: the final stage of an assessment.
//!
//! `build` joins the latest conversation snapshot with the latest ROM
//! reading, sends the combination to the diagnostic AI, persists the
//! exchange, and moves the assessment to its terminal state. The remote
//! call cannot join a database transaction, so the sequence is split: the
//! two reads and the AI call run first and are side-effect free, then the
//! analysis record and the completion update commit together. A failed
//! build can always be retried; each successful retry appends another
//! analysis record rather than replacing history.

use crate::error::{Error, Result};
use crate::history::{self, DecodedHistory, HistorySchema};
use crate::models::{AiResult, DashboardData, QuestionTurn};
use crate::motion;
use crate::store::TriageDb;
use crate::upstream::{AnalysisRequest, UpstreamClient};
use tracing::info;

/// Builds diagnostic summaries from accumulated assessment data
#[derive(Clone)]
pub struct DashboardAggregator {
    db: TriageDb,
    upstream: UpstreamClient,
}

impl DashboardAggregator {
    pub fn new(db: TriageDb, upstream: UpstreamClient) -> Self {
        Self { db, upstream }
    }

    /// Join the latest conversation snapshot and ROM reading.
    ///
    /// Both sources are preconditions: an assessment with no snapshot fails
    /// `ChatHistoryNotFound`, one with no reading fails `PoseDataNotFound`,
    /// regardless of what the other source holds.
    pub async fn fetch_assessment_data(&self, assessment_id: i64) -> Result<DashboardData> {
        let snapshot = self
            .db
            .latest_questionnaire(assessment_id)
            .await?
            .ok_or(Error::ChatHistoryNotFound)?;
        let decoded: DecodedHistory<QuestionTurn> =
            history::decode_history(Some(&snapshot.chat_history));
        if decoded.schema == HistorySchema::Unrecognized {
            // a snapshot that is not JSON at all cannot feed the AI; a
            // parsable document without a turn list keeps the empty default
            serde_json::from_str::<serde_json::Value>(&snapshot.chat_history)?;
        }

        let reading = self
            .db
            .latest_rom_reading(assessment_id)
            .await?
            .ok_or(Error::PoseDataNotFound)?;
        let range_of_motion = motion::unwrap_rom_document(&reading.pose_model_data)?;

        Ok(DashboardData {
            chat_history: decoded.turns,
            range_of_motion,
        })
    }

    /// Run the full build: fetch, analyze, persist, complete.
    pub async fn build(&self, assessment_id: i64) -> Result<AiResult> {
        let data = self.fetch_assessment_data(assessment_id).await?;

        let request = AnalysisRequest { content: data };
        let envelope = self.upstream.dashboard(&request).await?;
        let result = envelope.data;

        let assessment_data = serde_json::to_string(&request.content)?;
        let analysed_results = serde_json::to_string(&result.response)?;
        let analysis_id = self
            .db
            .record_build(assessment_id, &assessment_data, &analysed_results)
            .await?;
        info!(
            "assessment {} build complete, analysis record {}",
            assessment_id, analysis_id
        );

        Ok(result)
    }
}
