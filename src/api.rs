//! Envelope surface for the routing layer.
//!
//! Every operation answers the uniform `{success, statusCode, data,
//! error?}` envelope, with errors folded in rather than raised, so a thin
//! HTTP binding can serialize the return value directly. Status codes are
//! mapped centrally from the error taxonomy.

use crate::analysis::AnalysisGateway;
use crate::conversation::ConversationCollector;
use crate::dashboard::DashboardAggregator;
use crate::error::{Error, Result};
use crate::models::{ChatTurn, QuestionTurn};
use crate::motion::MotionCapture;
use crate::store::TriageDb;
use crate::upstream::UpstreamClient;
use crate::workflow::WorkflowController;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

/// The uniform response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiEnvelope {
    fn ok<T: Serialize>(status_code: u16, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                success: true,
                status_code,
                data,
                error: None,
            },
            Err(e) => Self::fail(Error::Json(e)),
        }
    }

    fn fail(err: Error) -> Self {
        let status_code = status_for(&err);
        error!("request failed ({}): {}", status_code, err);
        Self {
            success: false,
            status_code,
            data: Value::Null,
            error: Some(err.to_string()),
        }
    }

    fn from<T: Serialize>(status_code: u16, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(status_code, data),
            Err(err) => Self::fail(err),
        }
    }
}

/// HTTP-style status for an error
fn status_for(err: &Error) -> u16 {
    match err {
        Error::UserNotFound
        | Error::AssessmentNotFound
        | Error::ChatHistoryNotFound
        | Error::PoseDataNotFound
        | Error::RomNotFound
        | Error::AnalysisNotFound => 404,
        Error::InvalidStatus(_) | Error::InvalidTransition { .. } => 400,
        Error::Upstream(_) | Error::Http(_) => 502,
        _ => 500,
    }
}

/// The operations exposed to the routing layer, one per workflow method
#[derive(Clone)]
pub struct TriageApi {
    workflow: WorkflowController,
    conversation: ConversationCollector,
    motion: MotionCapture,
    dashboard: DashboardAggregator,
    analysis: AnalysisGateway,
}

impl TriageApi {
    pub fn new(db: TriageDb, upstream: UpstreamClient) -> Self {
        Self {
            workflow: WorkflowController::new(db.clone()),
            conversation: ConversationCollector::new(db.clone(), upstream.clone()),
            motion: MotionCapture::new(db.clone()),
            dashboard: DashboardAggregator::new(db.clone(), upstream.clone()),
            analysis: AnalysisGateway::new(db, upstream),
        }
    }

    async fn ensure_assessment(&self, assessment_id: i64) -> Result<()> {
        self.workflow.get_assessment(assessment_id).await.map(|_| ())
    }

    pub async fn create_assessment(
        &self,
        user_id: i64,
        anatomy_id: i64,
        assessment_type: &str,
    ) -> ApiEnvelope {
        ApiEnvelope::from(
            201,
            self.workflow
                .create_assessment(user_id, anatomy_id, assessment_type)
                .await,
        )
    }

    pub async fn get_assessment(&self, assessment_id: i64) -> ApiEnvelope {
        ApiEnvelope::from(200, self.workflow.get_assessment(assessment_id).await)
    }

    pub async fn update_status(&self, assessment_id: i64, status: &str) -> ApiEnvelope {
        ApiEnvelope::from(
            200,
            self.workflow
                .update_status(assessment_id, status)
                .await
                .map(|()| "assessment status updated"),
        )
    }

    pub async fn complete_assessment(&self, assessment_id: i64) -> ApiEnvelope {
        ApiEnvelope::from(
            200,
            self.workflow
                .complete_assessment(assessment_id)
                .await
                .map(|()| "assessment completed"),
        )
    }

    pub async fn submit_chat(&self, assessment_id: i64, turns: Vec<ChatTurn>) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(
            200,
            self.conversation.submit_chat_turns(assessment_id, turns).await,
        )
    }

    pub async fn submit_questionnaire(
        &self,
        assessment_id: i64,
        turns: Vec<QuestionTurn>,
        video: Option<String>,
    ) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(
            200,
            self.conversation
                .submit_questionnaire(assessment_id, turns, video)
                .await,
        )
    }

    pub async fn latest_questionnaire(&self, assessment_id: i64) -> ApiEnvelope {
        ApiEnvelope::from(200, self.conversation.latest_snapshot(assessment_id).await)
    }

    pub async fn submit_rom(
        &self,
        assessment_id: i64,
        minimum: &str,
        maximum: &str,
    ) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(
            201,
            self.motion
                .submit_reading(assessment_id, minimum, maximum)
                .await
                .map(|_| "ROM reading recorded"),
        )
    }

    pub async fn latest_rom(&self, assessment_id: i64) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(200, self.motion.latest_reading(assessment_id).await)
    }

    pub async fn build_dashboard(&self, assessment_id: i64) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(200, self.dashboard.build(assessment_id).await)
    }

    pub async fn latest_analysis(&self, assessment_id: i64) -> ApiEnvelope {
        if let Err(err) = self.ensure_assessment(assessment_id).await {
            return ApiEnvelope::fail(err);
        }
        ApiEnvelope::from(200, self.analysis.latest_analysis(assessment_id).await)
    }
}
