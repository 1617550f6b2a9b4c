//! Diagnostic AI gateway and analysis history.
//!
//! `analyze` is the single external call that turns aggregated assessment
//! data into a structured diagnostic result. Every completed dashboard
//! build leaves one historical record behind; `latest_analysis` reads the
//! newest one back.

use crate::error::{Error, Result};
use crate::models::{AiResult, DashboardData};
use crate::store::TriageDb;
use crate::upstream::{AnalysisRequest, UpstreamClient};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A persisted analysis record with both sides of the exchange decoded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub analysis_id: i64,
    pub assessment_id: i64,
    pub assessment_data: Value,
    pub analysed_results: Value,
    pub created_at: String,
}

/// Gateway to the diagnostic AI endpoint
#[derive(Clone)]
pub struct AnalysisGateway {
    db: TriageDb,
    upstream: UpstreamClient,
}

impl AnalysisGateway {
    pub fn new(db: TriageDb, upstream: UpstreamClient) -> Self {
        Self { db, upstream }
    }

    /// Submit aggregated assessment data for diagnostic analysis
    pub async fn analyze(&self, data: &DashboardData) -> Result<AiResult> {
        let request = AnalysisRequest {
            content: data.clone(),
        };
        let envelope = self.upstream.dashboard(&request).await?;
        debug!(
            "dashboard upstream answered success={} action={}",
            envelope.success, envelope.data.action
        );
        Ok(envelope.data)
    }

    /// The most recent analysis record for an assessment
    pub async fn latest_analysis(&self, assessment_id: i64) -> Result<AnalysisRecord> {
        let row = self
            .db
            .latest_analysis(assessment_id)
            .await?
            .ok_or(Error::AnalysisNotFound)?;

        Ok(AnalysisRecord {
            analysis_id: row.analysis_id,
            assessment_id: row.assessment_id,
            assessment_data: serde_json::from_str(&row.assessment_data)?,
            analysed_results: serde_json::from_str(&row.analysed_results)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::models::{AssessmentStatus, QuestionTurn, RangeOfMotion};
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer) -> (AnalysisGateway, TriageDb, i64, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = TriageDb::new(&tmp.path().join("test.db")).await.unwrap();
        let user_id = db.insert_user("Pat", "pat@example.com", "hash").await.unwrap();
        let row = db
            .insert_assessment(user_id, 3, "PAIN", AssessmentStatus::InProgress)
            .await
            .unwrap();
        let upstream = UpstreamClient::new(&UpstreamConfig {
            chat_url: format!("{}/chat", server.uri()),
            questionnaire_url: format!("{}/questionnaire", server.uri()),
            dashboard_url: format!("{}/dashboard", server.uri()),
            timeout_secs: 5,
        })
        .unwrap();
        (
            AnalysisGateway::new(db.clone(), upstream),
            db,
            row.assessment_id,
            tmp,
        )
    }

    fn sample_data() -> DashboardData {
        DashboardData {
            chat_history: vec![QuestionTurn {
                user: "where does it hurt".to_string(),
                assistant: "left knee".to_string(),
            }],
            range_of_motion: RangeOfMotion {
                minimum: "5".to_string(),
                maximum: "120".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_analyze_wraps_content_and_decodes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dashboard"))
            .and(body_partial_json(serde_json::json!({
                "content": {"rangeOfMotion": {"minimum": "5", "maximum": "120"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "statusCode": 200,
                "data": {
                    "response": {
                        "symptoms": ["restricted flexion"],
                        "possible_diagnosis": ["meniscus tear"],
                        "next_steps": "see a physio"
                    },
                    "action": "done"
                }
            })))
            .mount(&server)
            .await;

        let (gateway, _db, _id, _tmp) = setup(&server).await;
        let result = gateway.analyze(&sample_data()).await.unwrap();
        assert_eq!(result.response.possible_diagnosis, vec!["meniscus tear"]);
        assert_eq!(result.response.next_steps, "see a physio");
    }

    #[tokio::test]
    async fn test_analyze_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let (gateway, _db, _id, _tmp) = setup(&server).await;
        let err = gateway.analyze(&sample_data()).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn test_latest_analysis_reads_newest_record() {
        let server = MockServer::start().await;
        let (gateway, db, id, _tmp) = setup(&server).await;

        db.insert_analysis(id, r#"{"v":1}"#, r#"{"symptoms":[]}"#).await.unwrap();
        db.insert_analysis(id, r#"{"v":2}"#, r#"{"symptoms":["x"]}"#).await.unwrap();

        let record = gateway.latest_analysis(id).await.unwrap();
        assert_eq!(record.assessment_data["v"], 2);

        let err = gateway.latest_analysis(999).await.unwrap_err();
        assert!(matches!(err, Error::AnalysisNotFound));
    }
}
