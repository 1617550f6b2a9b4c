//! Default values for configuration

/// Default chat intake endpoint (body-pain-identification bot)
pub fn default_chat_url() -> String {
    std::env::var("TRIAGE_CHAT_URL").unwrap_or_else(|_| {
        "https://deecogs-bpi-bot-844145949029.europe-west1.run.app/chat".to_string()
    })
}

/// Default questionnaire endpoint (explainable-AI bot)
pub fn default_questionnaire_url() -> String {
    std::env::var("TRIAGE_QUESTIONNAIRE_URL").unwrap_or_else(|_| {
        "https://deecogs-xai-bot-844145949029.europe-west1.run.app/chat".to_string()
    })
}

/// Default diagnostic dashboard endpoint
pub fn default_dashboard_url() -> String {
    std::env::var("TRIAGE_DASHBOARD_URL").unwrap_or_else(|_| {
        "https://europe-west2-dochq-staging.cloudfunctions.net/deecogs-dashboard".to_string()
    })
}

/// Default upstream request timeout in seconds
pub fn default_upstream_timeout() -> u64 {
    30
}

/// Default maximum connections in the SQLite pool
pub fn default_max_connections() -> u32 {
    5
}
