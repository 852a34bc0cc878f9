//! drowse.stream_record.v1 schema definition
//!
//! Newline-delimited JSON stream format consumed by the CLI: one record per
//! line, either a heart-rate reading or a session control action. Used to
//! replay recorded drives and to feed live sessions over stdin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const STREAM_SCHEMA_VERSION: &str = "drowse.stream_record.v1";

/// Type of record contained in a stream line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Heart-rate reading from the sensor source
    Reading,
    /// Session control action from the controller
    Control,
}

/// Session control actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
        }
    }
}

/// One line of a monitoring stream.
///
/// `record_type` selects which of the optional fields apply: a `reading`
/// carries `bpm` and `taken_at`, a `control` carries `action`. `validate()`
/// rejects records whose fields do not match their type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Schema version identifier
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Type of record
    pub record_type: RecordType,
    /// Heart rate (bpm), readings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    /// When the reading was taken (UTC), readings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    /// Control action, controls only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ControlAction>,
}

fn default_schema_version() -> String {
    STREAM_SCHEMA_VERSION.to_string()
}

impl StreamRecord {
    /// Create a reading record
    pub fn reading(bpm: u32, taken_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: default_schema_version(),
            record_type: RecordType::Reading,
            bpm: Some(bpm),
            taken_at: Some(taken_at),
            action: None,
        }
    }

    /// Create a control record
    pub fn control(action: ControlAction) -> Self {
        Self {
            schema_version: default_schema_version(),
            record_type: RecordType::Control,
            bpm: None,
            taken_at: None,
            action: Some(action),
        }
    }

    /// Validate the record against the schema
    pub fn validate(&self) -> Result<(), StreamValidationError> {
        if self.schema_version != STREAM_SCHEMA_VERSION {
            return Err(StreamValidationError::InvalidSchemaVersion {
                expected: STREAM_SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        match self.record_type {
            RecordType::Reading => {
                if self.bpm.is_none() || self.taken_at.is_none() {
                    return Err(StreamValidationError::MissingField {
                        record_type: "reading".to_string(),
                        field: if self.bpm.is_none() { "bpm" } else { "taken_at" },
                    });
                }
                if self.bpm == Some(0) {
                    return Err(StreamValidationError::ZeroBpm);
                }
                if self.action.is_some() {
                    return Err(StreamValidationError::UnexpectedField {
                        record_type: "reading".to_string(),
                        field: "action",
                    });
                }
            }
            RecordType::Control => {
                if self.action.is_none() {
                    return Err(StreamValidationError::MissingField {
                        record_type: "control".to_string(),
                        field: "action",
                    });
                }
                if self.bpm.is_some() || self.taken_at.is_some() {
                    return Err(StreamValidationError::UnexpectedField {
                        record_type: "control".to_string(),
                        field: if self.bpm.is_some() { "bpm" } else { "taken_at" },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse newline-delimited JSON into records, keeping per-line errors.
    ///
    /// Blank lines are skipped. Indexes in the result refer to non-blank
    /// line positions in the input, zero-based.
    pub fn parse_ndjson(input: &str) -> Vec<(usize, Result<StreamRecord, String>)> {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| {
                let parsed = serde_json::from_str::<StreamRecord>(line)
                    .map_err(|e| e.to_string())
                    .and_then(|record| {
                        record.validate().map_err(|e| e.to_string())?;
                        Ok(record)
                    });
                (index, parsed)
            })
            .collect()
    }
}

/// Validation errors for stream records
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("{record_type} record is missing required field '{field}'")]
    MissingField {
        record_type: String,
        field: &'static str,
    },

    #[error("{record_type} record carries unexpected field '{field}'")]
    UnexpectedField {
        record_type: String,
        field: &'static str,
    },

    #[error("reading record must carry a positive bpm")]
    ZeroBpm,
}
