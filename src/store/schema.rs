//! SQLite schema definition

/// SQL schema for the triage database
pub const SCHEMA_SQL: &str = r#"
-- Users: owned by the account service; read-only for the workflow
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
);

-- Assessments: one row per triage session
CREATE TABLE IF NOT EXISTS assessments (
    assessment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    anatomy_id INTEGER NOT NULL,
    assessment_type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    status TEXT NOT NULL,
    completion_percentage REAL NOT NULL DEFAULT 0,
    chat_history TEXT
);

-- Questionnaires: append-only conversation snapshots at decision points
CREATE TABLE IF NOT EXISTS questionnaires (
    question_id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(assessment_id),
    chat_history TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- ROM readings: append-only range-of-motion documents
CREATE TABLE IF NOT EXISTS rom_analysis (
    rom_id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(assessment_id),
    pose_model_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- AI analysis: append-only history of dashboard builds
CREATE TABLE IF NOT EXISTS ai_analysis (
    analysis_id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(assessment_id),
    assessment_data TEXT NOT NULL,
    analysed_results TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Indexes for latest-by-timestamp lookups
CREATE INDEX IF NOT EXISTS idx_assessments_user ON assessments(user_id);
CREATE INDEX IF NOT EXISTS idx_questionnaires_assessment ON questionnaires(assessment_id, created_at);
CREATE INDEX IF NOT EXISTS idx_rom_assessment ON rom_analysis(assessment_id, created_at);
CREATE INDEX IF NOT EXISTS idx_analysis_assessment ON ai_analysis(assessment_id, created_at);
"#;
