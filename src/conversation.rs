//! Conversational intake and questionnaire collection.
//!
//! Both operations forward the full accumulated turn history (never a
//! delta) to their AI endpoint and persist a snapshot when the bot signals
//! a decision point via `data.action`. The two persistence paths differ on
//! purpose: chat overwrites the assessment's embedded document, while the
//! questionnaire appends a row per decision point.

use crate::error::{Error, Result};
use crate::history::{self, DecodedHistory};
use crate::models::{ChatRequest, ChatTurn, QuestionRequest, QuestionTurn};
use crate::store::TriageDb;
use crate::upstream::{BotData, UpstreamClient};
use serde::Serialize;
use tracing::{debug, info};

/// Action values that mark a conversation decision point
const ACTION_NEXT_API: &str = "next_api";
const ACTION_ROM_API: &str = "rom_api";

/// The latest persisted questionnaire snapshot, decoded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub question_id: i64,
    pub assessment_id: i64,
    pub chat_history: Vec<QuestionTurn>,
    pub created_at: String,
}

/// Collects conversational turns and snapshots them at decision points
#[derive(Clone)]
pub struct ConversationCollector {
    db: TriageDb,
    upstream: UpstreamClient,
}

impl ConversationCollector {
    pub fn new(db: TriageDb, upstream: UpstreamClient) -> Self {
        Self { db, upstream }
    }

    /// Forward the chat turn history to the intake bot.
    ///
    /// When the bot answers `action: "next_api"` the conversation is
    /// complete: the whole outbound payload replaces the assessment's
    /// embedded chat-history document, capturing the turn sequence at that
    /// moment. Earlier contents are discarded.
    pub async fn submit_chat_turns(
        &self,
        assessment_id: i64,
        turns: Vec<ChatTurn>,
    ) -> Result<BotData> {
        let request = ChatRequest { chat_history: turns };
        let payload_json = serde_json::to_string(&request)?;

        let envelope = self.upstream.chat(&request).await?;
        debug!(
            "chat upstream answered success={} action={:?}",
            envelope.success, envelope.data.action
        );

        if envelope.data.action.as_deref() == Some(ACTION_NEXT_API) {
            let affected = self
                .db
                .overwrite_chat_history(assessment_id, &payload_json)
                .await?;
            if affected == 0 {
                return Err(Error::AssessmentNotFound);
            }
            info!("assessment {} chat history captured", assessment_id);
        }

        Ok(envelope.data)
    }

    /// Forward the questionnaire turn history (plus an optional video
    /// reference for body-part identification).
    ///
    /// On `action: "next_api"` or `"rom_api"` a new snapshot row is
    /// appended. The bot's response payload is returned to the caller
    /// whether or not a snapshot was written.
    pub async fn submit_questionnaire(
        &self,
        assessment_id: i64,
        turns: Vec<QuestionTurn>,
        video: Option<String>,
    ) -> Result<BotData> {
        let request = QuestionRequest {
            chat_history: turns,
            video,
        };
        let payload_json = serde_json::to_string(&request)?;

        let envelope = self.upstream.questionnaire(&request).await?;
        debug!(
            "questionnaire upstream answered success={} action={:?}",
            envelope.success, envelope.data.action
        );

        if matches!(
            envelope.data.action.as_deref(),
            Some(ACTION_NEXT_API) | Some(ACTION_ROM_API)
        ) {
            let question_id = self
                .db
                .insert_questionnaire(assessment_id, &payload_json)
                .await?;
            info!(
                "assessment {} questionnaire snapshot {} appended",
                assessment_id, question_id
            );
        }

        Ok(envelope.data)
    }

    /// The most recent questionnaire snapshot for an assessment
    pub async fn latest_snapshot(&self, assessment_id: i64) -> Result<ConversationSnapshot> {
        let row = self
            .db
            .latest_questionnaire(assessment_id)
            .await?
            .ok_or(Error::ChatHistoryNotFound)?;

        let decoded: DecodedHistory<QuestionTurn> =
            history::decode_history(Some(&row.chat_history));
        Ok(ConversationSnapshot {
            question_id: row.question_id,
            assessment_id: row.assessment_id,
            chat_history: decoded.turns,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::models::AssessmentStatus;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer) -> (ConversationCollector, TriageDb, i64, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = TriageDb::new(&tmp.path().join("test.db")).await.unwrap();
        let user_id = db.insert_user("Pat", "pat@example.com", "hash").await.unwrap();
        let row = db
            .insert_assessment(user_id, 3, "PAIN", AssessmentStatus::Started)
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
            ConversationCollector::new(db.clone(), upstream),
            db,
            row.assessment_id,
            tmp,
        )
    }

    fn bot_reply(action: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "statusCode": 200,
            "data": {"response": "noted", "action": action}
        }))
    }

    fn turns(n: usize) -> Vec<ChatTurn> {
        (0..n)
            .map(|i| ChatTurn {
                user: format!("turn {}", i),
                response: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chat_without_decision_point_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(bot_reply("continue"))
            .mount(&server)
            .await;

        let (collector, db, id, _tmp) = setup(&server).await;
        let data = collector.submit_chat_turns(id, turns(1)).await.unwrap();
        assert_eq!(data.rest["response"], "noted");

        let row = db.get_assessment(id).await.unwrap().unwrap();
        assert_eq!(row.chat_history, None);
    }

    #[tokio::test]
    async fn test_chat_next_api_overwrites_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(bot_reply("next_api"))
            .mount(&server)
            .await;

        let (collector, db, id, _tmp) = setup(&server).await;
        db.overwrite_chat_history(id, r#"[{"user":"stale"}]"#).await.unwrap();

        collector.submit_chat_turns(id, turns(2)).await.unwrap();

        let row = db.get_assessment(id).await.unwrap().unwrap();
        let stored = row.chat_history.unwrap();
        // entire outbound payload, prior value discarded
        assert!(stored.contains("\"turn 0\""));
        assert!(stored.contains("\"chat_history\""));
        assert!(!stored.contains("stale"));
    }

    #[tokio::test]
    async fn test_chat_next_api_unknown_assessment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(bot_reply("next_api"))
            .mount(&server)
            .await;

        let (collector, _db, _id, _tmp) = setup(&server).await;
        let err = collector.submit_chat_turns(999, turns(1)).await.unwrap_err();
        assert!(matches!(err, Error::AssessmentNotFound));
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (collector, db, id, _tmp) = setup(&server).await;
        let err = collector.submit_chat_turns(id, turns(1)).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));

        let row = db.get_assessment(id).await.unwrap().unwrap();
        assert_eq!(row.chat_history, None);
    }

    #[tokio::test]
    async fn test_questionnaire_appends_on_rom_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/questionnaire"))
            .respond_with(bot_reply("rom_api"))
            .mount(&server)
            .await;

        let (collector, _db, id, _tmp) = setup(&server).await;
        let qturns = vec![QuestionTurn {
            user: "where does it hurt".to_string(),
            assistant: "left knee".to_string(),
        }];

        collector
            .submit_questionnaire(id, qturns.clone(), Some("clip.webm".to_string()))
            .await
            .unwrap();
        collector.submit_questionnaire(id, qturns, None).await.unwrap();

        // both decision points produced a row; latest wins
        let snapshot = collector.latest_snapshot(id).await.unwrap();
        assert_eq!(snapshot.chat_history.len(), 1);
        assert_eq!(snapshot.chat_history[0].assistant, "left knee");
    }

    #[tokio::test]
    async fn test_questionnaire_returns_data_without_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/questionnaire"))
            .respond_with(bot_reply("continue"))
            .mount(&server)
            .await;

        let (collector, _db, id, _tmp) = setup(&server).await;
        let data = collector
            .submit_questionnaire(id, vec![], None)
            .await
            .unwrap();
        assert_eq!(data.action.as_deref(), Some("continue"));

        let err = collector.latest_snapshot(id).await.unwrap_err();
        assert!(matches!(err, Error::ChatHistoryNotFound));
    }

    #[tokio::test]
    async fn test_latest_snapshot_decodes_stored_payload() {
        let server = MockServer::start().await;
        let (collector, db, id, _tmp) = setup(&server).await;

        // snapshots are stored as the outbound request object; the codec
        // unwraps the nested list
        db.insert_questionnaire(
            id,
            r#"{"chat_history":[{"user":"a","assistant":"b"}],"video":"v.webm"}"#,
        )
        .await
        .unwrap();

        let snapshot = collector.latest_snapshot(id).await.unwrap();
        assert_eq!(snapshot.chat_history.len(), 1);
        assert_eq!(snapshot.chat_history[0].user, "a");
    }
}
