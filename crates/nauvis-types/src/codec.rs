//! Line codec for the telemetry stream.
//!
//! [`encode_line`] always produces the canonical `type`-tagged form.
//! [`decode_line`] additionally accepts the older untagged shape, where event
//! lines carry `"stream": "event"` instead of a `type` field and stats lines
//! carry no tag at all, and normalises both into a [`Record`].

use serde_json::{Map, Value};

use crate::records::Record;

/// Tag field of the canonical schema.
const TYPE_FIELD: &str = "type";

/// Tag field used by legacy event lines.
const LEGACY_STREAM_FIELD: &str = "stream";

/// Errors that can occur while decoding a line.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The line was empty or whitespace only.
    #[error("empty line")]
    Empty,

    /// The line is not valid JSON or does not match any record shape.
    #[error("invalid record JSON: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The line is valid JSON but not an object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// The object carries no tag and does not look like a legacy record.
    #[error("unrecognized record shape (keys: {keys})")]
    UnrecognizedShape {
        /// Comma-separated top-level keys of the offending object.
        keys: String,
    },
}

/// Serialize a record as a single newline-terminated JSON line.
///
/// # Errors
///
/// Returns the serializer error if the record cannot be represented as JSON
/// (for example a non-finite float).
pub fn encode_line(record: &Record) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Parse one line of the stream into a [`Record`].
///
/// Surrounding whitespace (including the trailing newline) is ignored.
///
/// # Errors
///
/// Returns [`DecodeError`] if the line is empty, not a JSON object, or does
/// not match either the canonical or the legacy record shapes.
pub fn decode_line(line: &str) -> Result<Record, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let Value::Object(mut map) = serde_json::from_str::<Value>(trimmed)? else {
        return Err(DecodeError::NotAnObject);
    };

    if !map.contains_key(TYPE_FIELD) {
        let tag = legacy_tag(&map).ok_or_else(|| DecodeError::UnrecognizedShape {
            keys: map.keys().cloned().collect::<Vec<_>>().join(","),
        })?;
        map.remove(LEGACY_STREAM_FIELD);
        map.insert(TYPE_FIELD.to_owned(), Value::String(tag.to_owned()));
    }

    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Infer the canonical tag of an untagged legacy object.
fn legacy_tag(map: &Map<String, Value>) -> Option<&'static str> {
    if map.get(LEGACY_STREAM_FIELD).and_then(Value::as_str) == Some("event") {
        return Some("event");
    }
    if map.contains_key("cycle") && map.contains_key("products_production") {
        return Some("stats");
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::records::{EventKind, GameEvent, SessionInitRecord, StatsRecord};
    use crate::session::SessionId;

    #[test]
    fn encoded_line_is_single_newline_terminated_object() {
        let record = Record::SessionInit(SessionInitRecord {
            session_id: SessionId::from("nauvis_1_100000"),
            tick: 0,
            level_name: "nauvis".to_owned(),
        });
        let line = encode_line(&record).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.starts_with("{\"type\":\"session_init\""));
    }

    #[test]
    fn decodes_canonical_line() {
        let line = r#"{"type":"event","session_id":"s","tick":30,"player_index":1,"event_name":"on_research_started","tech_name":"logistics","tech_level":2}"#;
        let record = decode_line(line).unwrap();
        let Record::Event(event) = record else {
            panic!("expected event record");
        };
        assert_eq!(event.tick, 30);
        assert_eq!(event.event.kind(), EventKind::ResearchStarted);
    }

    #[test]
    fn decodes_legacy_event_line() {
        let line = r#"{"stream": "event", "session_id": "nauvis_1_123456", "tick": 60, "event_name": "on_built_entity", "player_index": 1, "entity": "inserter", "position": {"x": 3.5, "y": 71.2}}"#;
        let record = decode_line(line).unwrap();
        let Record::Event(event) = record else {
            panic!("expected event record");
        };
        assert_eq!(event.session_id.as_str(), "nauvis_1_123456");
        match event.event {
            GameEvent::EntityBuilt {
                entity, surface, ..
            } => {
                assert_eq!(entity, "inserter");
                assert_eq!(surface, "nauvis");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn decodes_legacy_research_line_without_level() {
        let line = r#"{"stream": "event", "session_id": "s", "tick": 90, "event_name": "on_research_finished", "player_index": 1, "tech_name": "electronics", "duration": 312.07}"#;
        let Record::Event(event) = decode_line(line).unwrap() else {
            panic!("expected event record");
        };
        match event.event {
            GameEvent::ResearchFinished {
                tech_level,
                duration,
                ..
            } => {
                assert_eq!(tech_level, 1);
                assert!(duration.is_some());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn decodes_legacy_stats_line() {
        let line = r#"{"session_id": "s", "cycle": 2, "tick": 240, "products_production": {"coal": 12.34567}, "materials_consumption": {}}"#;
        let Record::Stats(stats) = decode_line(line).unwrap() else {
            panic!("expected stats record");
        };
        assert_eq!(stats.cycle, 2);
        assert!(stats.player.is_none());
        assert!(stats.screenshot_path.is_none());
        assert_eq!(stats.products_production.len(), 1);
    }

    #[test]
    fn canonical_stats_survive_encode_decode() {
        let mut production = BTreeMap::new();
        production.insert("water".to_owned(), 431.5);
        let record = Record::Stats(StatsRecord {
            session_id: SessionId::from("s"),
            cycle: 3,
            tick: 360,
            player: None,
            screenshot_path: Some("screenshots/s_360.png".to_owned()),
            products_production: production,
            materials_consumption: BTreeMap::new(),
        });
        let line = encode_line(&record).unwrap();
        assert_eq!(decode_line(&line).unwrap(), record);
    }

    #[test]
    fn rejects_empty_and_non_object_lines() {
        assert!(matches!(decode_line("   \n"), Err(DecodeError::Empty)));
        assert!(matches!(decode_line("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_line("{not json"), Err(DecodeError::Json { .. })));
    }

    #[test]
    fn rejects_untagged_unknown_shape() {
        let err = decode_line(r#"{"session_id":"s","tick":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnrecognizedShape { .. }));
    }

    #[test]
    fn rejects_unknown_event_name() {
        let line = r#"{"type":"event","session_id":"s","tick":1,"player_index":1,"event_name":"on_rocket_launched"}"#;
        assert!(matches!(decode_line(line), Err(DecodeError::Json { .. })));
    }
}
