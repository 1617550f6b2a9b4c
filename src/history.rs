//! Versioned codec for persisted chat-history documents.
//!
//! The persisted shape changed over the system's life: new writes store a
//! flat list of turns, while older rows hold the whole outbound request
//! object with the list under a nested `chat_history` key. Reads must accept
//! both, and anything outside the two known shapes decodes to an empty list
//! so historical rows can never make an assessment unreadable.
//!
//! Legacy and unrecognized reads are flagged on the result and logged, so
//! they can be found and migrated instead of silently tolerated forever.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Which schema a persisted history document matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySchema {
    /// Column was NULL or empty; benign initial state
    Empty,
    /// Flat list of turns; the shape all new writes use
    Current,
    /// Request object with the list under a nested `chat_history` key
    LegacyNested,
    /// Neither shape matched; decoded as empty
    Unrecognized,
}

/// A decoded history plus the schema it was found in
#[derive(Debug, Clone)]
pub struct DecodedHistory<T> {
    pub turns: Vec<T>,
    pub schema: HistorySchema,
}

impl<T> DecodedHistory<T> {
    fn empty(schema: HistorySchema) -> Self {
        Self {
            turns: Vec::new(),
            schema,
        }
    }

    /// True when the row should eventually be rewritten in the current shape
    pub fn needs_migration(&self) -> bool {
        matches!(
            self.schema,
            HistorySchema::LegacyNested | HistorySchema::Unrecognized
        )
    }
}

/// Decode a persisted history document in any known shape.
///
/// Total: structural database errors are the caller's problem, but no
/// document content can make this fail.
pub fn decode_history<T: DeserializeOwned>(raw: Option<&str>) -> DecodedHistory<T> {
    let Some(raw) = raw else {
        return DecodedHistory::empty(HistorySchema::Empty);
    };
    if raw.trim().is_empty() || raw == "null" {
        return DecodedHistory::empty(HistorySchema::Empty);
    }

    if let Ok(turns) = serde_json::from_str::<Vec<T>>(raw) {
        return DecodedHistory {
            turns,
            schema: HistorySchema::Current,
        };
    }

    if let Ok(outer) = serde_json::from_str::<serde_json::Value>(raw) {
        if let Some(inner) = outer.get("chat_history") {
            match serde_json::from_value::<Vec<T>>(inner.clone()) {
                Ok(turns) => {
                    debug!("nested chat_history document read");
                    return DecodedHistory {
                        turns,
                        schema: HistorySchema::LegacyNested,
                    };
                }
                Err(e) => {
                    warn!("nested chat_history list failed to decode: {}", e);
                }
            }
        }
    }

    warn!("chat_history document in no known shape, using empty list");
    DecodedHistory::empty(HistorySchema::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatTurn, QuestionTurn};

    #[test]
    fn test_null_column_is_empty() {
        let decoded = decode_history::<ChatTurn>(None);
        assert!(decoded.turns.is_empty());
        assert_eq!(decoded.schema, HistorySchema::Empty);
        assert!(!decoded.needs_migration());
    }

    #[test]
    fn test_json_null_is_empty() {
        let decoded = decode_history::<ChatTurn>(Some("null"));
        assert_eq!(decoded.schema, HistorySchema::Empty);
    }

    #[test]
    fn test_flat_list_decodes_as_current() {
        let raw = r#"[{"user":"hi","response":"hello"},{"user":"my knee hurts"}]"#;
        let decoded = decode_history::<ChatTurn>(Some(raw));
        assert_eq!(decoded.schema, HistorySchema::Current);
        assert_eq!(decoded.turns.len(), 2);
        assert_eq!(decoded.turns[0].response.as_deref(), Some("hello"));
        assert_eq!(decoded.turns[1].response, None);
    }

    #[test]
    fn test_legacy_nested_decodes_and_flags() {
        let raw = r#"{"chat_history":[{"user":"hi","assistant":"hello"}],"video":"clip.webm"}"#;
        let decoded = decode_history::<QuestionTurn>(Some(raw));
        assert_eq!(decoded.schema, HistorySchema::LegacyNested);
        assert_eq!(decoded.turns.len(), 1);
        assert_eq!(decoded.turns[0].assistant, "hello");
        assert!(decoded.needs_migration());
    }

    #[test]
    fn test_legacy_and_flat_decode_identically() {
        let flat = r#"[{"user":"a","assistant":"b"}]"#;
        let nested = r#"{"chat_history":[{"user":"a","assistant":"b"}]}"#;
        let from_flat = decode_history::<QuestionTurn>(Some(flat));
        let from_nested = decode_history::<QuestionTurn>(Some(nested));
        assert_eq!(from_flat.turns, from_nested.turns);
    }

    #[test]
    fn test_unparsable_defaults_to_empty() {
        for raw in ["not json at all", "{\"foo\": 1}", "{broken", "42"] {
            let decoded = decode_history::<ChatTurn>(Some(raw));
            assert!(decoded.turns.is_empty(), "raw {:?} should decode empty", raw);
            assert_eq!(decoded.schema, HistorySchema::Unrecognized);
        }
    }
}
