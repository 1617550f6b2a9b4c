//! Physiotherapy triage workflow backend.
//!
//! Assessments move through a staged lifecycle: conversational intake,
//! questionnaire collection, range-of-motion capture, and a final
//! AI-analyzed dashboard build. The crate keeps all state in SQLite and
//! talks to three upstream AI endpoints over HTTP.

pub mod analysis;
pub mod api;
pub mod config;
pub mod conversation;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod models;
pub mod motion;
pub mod store;
pub mod upstream;
pub mod workflow;
