//! Custom error types for triage

use thiserror::Error;

/// Main error type for triage operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("user not found")]
    UserNotFound,

    #[error("assessment not found")]
    AssessmentNotFound,

    #[error("chat history not found")]
    ChatHistoryNotFound,

    #[error("pose model data not found")]
    PoseDataNotFound,

    #[error("ROM reading not found")]
    RomNotFound,

    #[error("AI analysis not found")]
    AnalysisNotFound,

    #[error("invalid assessment status: {0}")]
    InvalidStatus(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("rangeOfMotion format incorrect")]
    RomFormatInvalid,

    #[error("upstream AI error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for triage
pub type Result<T> = std::result::Result<T, Error>;
