//! Triage database storage using SQLite
//!
//! This module handles all persistence:
//! - Assessments (lifecycle rows, embedded chat-history document)
//! - Questionnaires (append-only conversation snapshots)
//! - ROM readings (append-only range-of-motion documents)
//! - AI analysis records (append-only build history)
//! - User existence/lookup (the users table is owned by the account service)

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::Result;
use crate::models::{AssessmentStatus, User};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::{debug, info};

/// Current UTC time as the RFC3339 string the tables store
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// A raw assessment row; the chat-history document is decoded by the caller
#[derive(Debug, Clone, FromRow)]
pub struct AssessmentRow {
    pub assessment_id: i64,
    pub user_id: i64,
    pub anatomy_id: i64,
    pub assessment_type: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: String,
    pub completion_percentage: f64,
    pub chat_history: Option<String>,
}

/// A persisted conversation snapshot
#[derive(Debug, Clone, FromRow)]
pub struct QuestionnaireRow {
    pub question_id: i64,
    pub assessment_id: i64,
    pub chat_history: String,
    pub created_at: String,
}

/// A persisted ROM reading document
#[derive(Debug, Clone, FromRow)]
pub struct RomRow {
    pub rom_id: i64,
    pub assessment_id: i64,
    pub pose_model_data: String,
    pub created_at: String,
}

/// A persisted AI analysis record
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub analysis_id: i64,
    pub assessment_id: i64,
    pub assessment_data: String,
    pub analysed_results: String,
    pub created_at: String,
}

/// Triage database handle
#[derive(Clone)]
pub struct TriageDb {
    pool: SqlitePool,
}

impl TriageDb {
    /// Connect to the database configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file, config.database.max_connections).await
    }

    /// Open a database at a specific path, bootstrapping the schema if needed
    pub async fn new(db_path: &Path) -> Result<Self> {
        Self::open(db_path, 5).await
    }

    async fn open(db_path: &Path, max_connections: u32) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='assessments'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== User Operations (account-service collaborator surface) =====

    /// Check whether a user id exists
    pub async fn user_exists(&self, user_id: i64) -> Result<bool> {
        let exists: i32 =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = ?)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists != 0)
    }

    /// Look up a user by email
    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<(i64, String, String, String)> =
            sqlx::query_as("SELECT user_id, name, email, password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(user_id, name, email, password_hash)| User {
            user_id,
            name,
            email,
            password_hash,
        }))
    }

    /// Insert a user row. Provisioning belongs to the account service; this
    /// exists for local setups and tests.
    pub async fn insert_user(&self, name: &str, email: &str, password: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(password)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    // ===== Assessment Operations =====

    /// Insert a new assessment row and return it
    pub async fn insert_assessment(
        &self,
        user_id: i64,
        anatomy_id: i64,
        assessment_type: &str,
        status: AssessmentStatus,
    ) -> Result<AssessmentRow> {
        let start_time = now_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO assessments (user_id, anatomy_id, assessment_type, start_time, status, completion_percentage)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(user_id)
        .bind(anatomy_id)
        .bind(assessment_type)
        .bind(&start_time)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(AssessmentRow {
            assessment_id: result.last_insert_rowid(),
            user_id,
            anatomy_id,
            assessment_type: assessment_type.to_string(),
            start_time,
            end_time: None,
            status: status.to_string(),
            completion_percentage: 0.0,
            chat_history: None,
        })
    }

    /// Get an assessment row by id
    pub async fn get_assessment(&self, assessment_id: i64) -> Result<Option<AssessmentRow>> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT assessment_id, user_id, anatomy_id, assessment_type, start_time,
                   end_time, status, completion_percentage, chat_history
            FROM assessments
            WHERE assessment_id = ?
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update an assessment's status; returns the number of rows affected
    pub async fn update_assessment_status(
        &self,
        assessment_id: i64,
        status: AssessmentStatus,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE assessments SET status = ? WHERE assessment_id = ?")
            .bind(status.to_string())
            .bind(assessment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Overwrite the embedded chat-history document; returns rows affected
    pub async fn overwrite_chat_history(
        &self,
        assessment_id: i64,
        payload_json: &str,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE assessments SET chat_history = ? WHERE assessment_id = ?")
                .bind(payload_json)
                .bind(assessment_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Mark an assessment completed: status, completion 100, end time now.
    /// Unconditional and repeatable.
    pub async fn mark_assessment_complete(&self, assessment_id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE assessments
            SET status = ?, completion_percentage = 100, end_time = ?
            WHERE assessment_id = ?
            "#,
        )
        .bind(AssessmentStatus::Completed.to_string())
        .bind(now_rfc3339())
        .bind(assessment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ===== Questionnaire Operations =====

    /// Append a conversation snapshot
    pub async fn insert_questionnaire(
        &self,
        assessment_id: i64,
        chat_history_json: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO questionnaires (assessment_id, chat_history, created_at) VALUES (?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(chat_history_json)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the most recent conversation snapshot for an assessment
    pub async fn latest_questionnaire(
        &self,
        assessment_id: i64,
    ) -> Result<Option<QuestionnaireRow>> {
        let row = sqlx::query_as::<_, QuestionnaireRow>(
            r#"
            SELECT question_id, assessment_id, chat_history, created_at
            FROM questionnaires
            WHERE assessment_id = ?
            ORDER BY created_at DESC, question_id DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ===== ROM Operations =====

    /// Append a ROM reading document
    pub async fn insert_rom_reading(
        &self,
        assessment_id: i64,
        pose_model_data_json: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO rom_analysis (assessment_id, pose_model_data, created_at) VALUES (?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(pose_model_data_json)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the most recent ROM reading for an assessment
    pub async fn latest_rom_reading(&self, assessment_id: i64) -> Result<Option<RomRow>> {
        let row = sqlx::query_as::<_, RomRow>(
            r#"
            SELECT rom_id, assessment_id, pose_model_data, created_at
            FROM rom_analysis
            WHERE assessment_id = ?
            ORDER BY created_at DESC, rom_id DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ===== AI Analysis Operations =====

    /// Append an AI analysis record
    pub async fn insert_analysis(
        &self,
        assessment_id: i64,
        assessment_data_json: &str,
        analysed_results_json: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO ai_analysis (assessment_id, assessment_data, analysed_results, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(assessment_id)
        .bind(assessment_data_json)
        .bind(analysed_results_json)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the most recent AI analysis record for an assessment
    pub async fn latest_analysis(&self, assessment_id: i64) -> Result<Option<AnalysisRow>> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT analysis_id, assessment_id, assessment_data, analysed_results, created_at
            FROM ai_analysis
            WHERE assessment_id = ?
            ORDER BY created_at DESC, analysis_id DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Persist a dashboard build outcome: the analysis record and the
    /// completion update commit together, so a crash between them cannot
    /// leave an orphaned record with the assessment still open.
    pub async fn record_build(
        &self,
        assessment_id: i64,
        assessment_data_json: &str,
        analysed_results_json: &str,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO ai_analysis (assessment_id, assessment_data, analysed_results, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(assessment_id)
        .bind(assessment_data_json)
        .bind(analysed_results_json)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await?;
        let analysis_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            UPDATE assessments
            SET status = ?, completion_percentage = 100, end_time = ?
            WHERE assessment_id = ?
            "#,
        )
        .bind(AssessmentStatus::Completed.to_string())
        .bind(now_rfc3339())
        .bind(assessment_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(analysis_id)
    }
}
