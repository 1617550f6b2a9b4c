//! Range-of-motion capture and retrieval.
//!
//! Readings are appended as `{"rangeOfMotion": {"minimum", "maximum"}}`
//! documents with the bounds kept as decimal strings, so measurement
//! precision survives storage untouched. Unlike chat history, a reading
//! document without the `rangeOfMotion` key is an error, not a default:
//! it means the measurement was never actually captured.

use crate::error::{Error, Result};
use crate::models::RangeOfMotion;
use crate::store::TriageDb;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The persisted reading document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RomDocument {
    #[serde(rename = "rangeOfMotion")]
    range_of_motion: RangeOfMotion,
}

/// A reading as returned to callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RomReading {
    pub rom_id: i64,
    pub assessment_id: i64,
    pub range_of_motion: RangeOfMotion,
    pub created_at: String,
}

/// Unwrap the nested `rangeOfMotion` member of a persisted document
pub(crate) fn unwrap_rom_document(raw: &str) -> Result<RangeOfMotion> {
    let outer: serde_json::Value = serde_json::from_str(raw)?;
    let inner = outer.get("rangeOfMotion").ok_or(Error::RomFormatInvalid)?;
    Ok(serde_json::from_value(inner.clone())?)
}

/// Stores and retrieves range-of-motion readings
#[derive(Clone)]
pub struct MotionCapture {
    db: TriageDb,
}

impl MotionCapture {
    pub fn new(db: TriageDb) -> Self {
        Self { db }
    }

    /// Append a reading. The pair is recorded as given; no ordering check
    /// between minimum and maximum is applied.
    pub async fn submit_reading(
        &self,
        assessment_id: i64,
        minimum: &str,
        maximum: &str,
    ) -> Result<i64> {
        let document = RomDocument {
            range_of_motion: RangeOfMotion {
                minimum: minimum.to_string(),
                maximum: maximum.to_string(),
            },
        };
        let json = serde_json::to_string(&document)?;
        let rom_id = self.db.insert_rom_reading(assessment_id, &json).await?;
        info!("assessment {} ROM reading {} recorded", assessment_id, rom_id);
        Ok(rom_id)
    }

    /// The most recent reading for an assessment
    pub async fn latest_reading(&self, assessment_id: i64) -> Result<RomReading> {
        let row = self
            .db
            .latest_rom_reading(assessment_id)
            .await?
            .ok_or(Error::RomNotFound)?;

        let range_of_motion = unwrap_rom_document(&row.pose_model_data)?;
        Ok(RomReading {
            rom_id: row.rom_id,
            assessment_id: row.assessment_id,
            range_of_motion,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssessmentStatus;
    use tempfile::TempDir;

    async fn setup() -> (MotionCapture, TriageDb, i64, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = TriageDb::new(&tmp.path().join("test.db")).await.unwrap();
        let user_id = db.insert_user("Pat", "pat@example.com", "hash").await.unwrap();
        let row = db
            .insert_assessment(user_id, 3, "PAIN", AssessmentStatus::Started)
            .await
            .unwrap();
        (MotionCapture::new(db.clone()), db, row.assessment_id, tmp)
    }

    #[tokio::test]
    async fn test_reading_round_trips_verbatim() {
        let (motion, _db, id, _tmp) = setup().await;

        motion.submit_reading(id, "5", "120").await.unwrap();

        let reading = motion.latest_reading(id).await.unwrap();
        assert_eq!(reading.range_of_motion.minimum, "5");
        assert_eq!(reading.range_of_motion.maximum, "120");
    }

    #[tokio::test]
    async fn test_high_precision_values_do_not_drift() {
        let (motion, _db, id, _tmp) = setup().await;

        motion
            .submit_reading(id, "12.300000000000001", "179.99999999999997")
            .await
            .unwrap();

        let reading = motion.latest_reading(id).await.unwrap();
        assert_eq!(reading.range_of_motion.minimum, "12.300000000000001");
        assert_eq!(reading.range_of_motion.maximum, "179.99999999999997");
    }

    #[tokio::test]
    async fn test_latest_wins() {
        let (motion, _db, id, _tmp) = setup().await;

        motion.submit_reading(id, "0", "90").await.unwrap();
        motion.submit_reading(id, "5", "120").await.unwrap();

        let reading = motion.latest_reading(id).await.unwrap();
        assert_eq!(reading.range_of_motion.maximum, "120");
    }

    #[tokio::test]
    async fn test_inverted_pair_is_accepted() {
        let (motion, _db, id, _tmp) = setup().await;

        motion.submit_reading(id, "120", "5").await.unwrap();
        let reading = motion.latest_reading(id).await.unwrap();
        assert_eq!(reading.range_of_motion.minimum, "120");
    }

    #[tokio::test]
    async fn test_missing_reading() {
        let (motion, _db, _id, _tmp) = setup().await;
        let err = motion.latest_reading(999).await.unwrap_err();
        assert!(matches!(err, Error::RomNotFound));
    }

    #[tokio::test]
    async fn test_document_without_rom_key_is_invalid() {
        let (motion, db, id, _tmp) = setup().await;

        db.insert_rom_reading(id, r#"{"poseLandmarks": []}"#).await.unwrap();

        let err = motion.latest_reading(id).await.unwrap_err();
        assert!(matches!(err, Error::RomFormatInvalid));
    }
}
