//! HTTP client for the external AI endpoints.
//!
//! One explicitly constructed client serves all three upstreams (chat
//! intake, questionnaire, diagnostic dashboard). Endpoints and the request
//! timeout come from configuration, so tests can point the client at a mock
//! server. Calls are synchronous single attempts: a failed or malformed
//! response surfaces as `Error::Upstream` immediately, with no retry.

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::models::{AiResult, ChatRequest, DashboardData, QuestionRequest};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Envelope returned by the chat and questionnaire endpoints.
///
/// `data` is mostly opaque bot output passed back to the caller; only
/// `action` is inspected here to decide whether a snapshot gets persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotEnvelope {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    pub data: BotData,
}

/// The `data` member of a bot envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// Envelope returned by the diagnostic dashboard endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEnvelope {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    pub data: AiResult,
}

/// Wrapper the dashboard endpoint expects around the aggregated data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub content: DashboardData,
}

/// Client for the external AI services
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    chat_url: Url,
    questionnaire_url: Url,
    dashboard_url: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            chat_url: Url::parse(&config.chat_url)?,
            questionnaire_url: Url::parse(&config.questionnaire_url)?,
            dashboard_url: Url::parse(&config.dashboard_url)?,
        })
    }

    /// Send the full chat turn history to the intake bot
    pub async fn chat(&self, request: &ChatRequest) -> Result<BotEnvelope> {
        self.post_envelope(&self.chat_url, request, "chat").await
    }

    /// Send the questionnaire turn history (and optional video reference)
    pub async fn questionnaire(&self, request: &QuestionRequest) -> Result<BotEnvelope> {
        self.post_envelope(&self.questionnaire_url, request, "questionnaire")
            .await
    }

    /// Send the aggregated assessment data for diagnostic analysis
    pub async fn dashboard(&self, request: &AnalysisRequest) -> Result<DashboardEnvelope> {
        self.post_envelope(&self.dashboard_url, request, "dashboard")
            .await
    }

    /// POST a JSON body and decode the typed envelope. The whole response
    /// body is read before decoding so the raw text can be logged when the
    /// envelope does not parse.
    async fn post_envelope<B, E>(&self, url: &Url, body: &B, endpoint: &str) -> Result<E>
    where
        B: Serialize,
        E: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("{} request failed: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "{} endpoint answered {}",
                endpoint, status
            )));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("{} response read failed: {}", endpoint, e)))?;
        debug!("{} raw response: {}", endpoint, raw);

        serde_json::from_str(&raw).map_err(|e| {
            warn!("{} envelope failed to decode: {}; body: {}", endpoint, e, raw);
            Error::Upstream(format!("{} envelope failed to decode: {}", endpoint, e))
        })
    }
}
