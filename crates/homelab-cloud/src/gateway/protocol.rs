//! Result protocol
//!
//! A helper writes one JSON object per line. The last line that parses as a
//! JSON object is the result; anything after it (diagnostics, blank lines)
//! is ignored.
//!
//! ```text
//! {"level":"DEBUG","message":"downloading"}
//! {"level":"INFO","event":"fetch_success","message":"done","file":"/tmp/a.iso"}
//! ```

use crate::error::{CloudError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const EVENT_FETCH_SUCCESS: &str = "fetch_success";
pub const EVENT_REMASTER_SUCCESS: &str = "remaster_success";
pub const FIELD_FILE: &str = "file";
pub const FIELD_OUTPUT_PATH: &str = "output_path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Debug,
    Error,
}

impl Level {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "INFO" => Some(Level::Info),
            "DEBUG" => Some(Level::Debug),
            "ERROR" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Level::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown level {}", raw)))
    }
}

/// One protocol line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub level: Level,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default)]
    pub message: String,
    /// Operation-specific fields, e.g. `file`
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ResultRecord {
    pub fn new(level: Level, event: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            event: event.into(),
            message: message.into(),
            payload: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Last line of `output` holding a JSON object
pub fn last_object(output: &str) -> Option<Map<String, Value>> {
    output.lines().rev().find_map(|line| {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Interpret helper output. An `ERROR` record becomes an operational error
/// carrying its message; no record or an unrecognised shape is an unknown status.
pub fn parse_output(source: &str, output: &str) -> Result<ResultRecord> {
    let object = last_object(output).ok_or_else(|| CloudError::UnknownStatus(source.to_string()))?;
    let record: ResultRecord = serde_json::from_value(Value::Object(object))
        .map_err(|_| CloudError::UnknownStatus(source.to_string()))?;

    if record.level == Level::Error {
        return Err(CloudError::Operational(record.message));
    }
    Ok(record)
}

/// Payload field `field` of a successful result
pub fn expect_field(source: &str, output: &str, field: &str) -> Result<String> {
    let record = parse_output(source, output)?;
    tracing::debug!("{} reported {} {}", source, record.level, record.event);
    record
        .field_str(field)
        .map(str::to_string)
        .ok_or_else(|| CloudError::UnknownStatus(source.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_record_is_operational() {
        let output = "starting\nsome noise\n{\"level\":\"ERROR\",\"message\":\"boom\"}\n";
        let err = parse_output("iso get", output).unwrap_err();
        assert!(matches!(err, CloudError::Operational(ref m) if m == "boom"));
    }

    #[test]
    fn test_info_record_returns_payload() {
        let output = concat!(
            "{\"level\":\"DEBUG\",\"message\":\"downloading\"}\n",
            "not json\n",
            "{\"level\":\"info\",\"event\":\"fetch_success\",\"message\":\"ok\",\"file\":\"/tmp/a.iso\"}\n",
        );
        assert_eq!(expect_field("iso get", output, FIELD_FILE).unwrap(), "/tmp/a.iso");
    }

    #[test]
    fn test_trailing_diagnostics_ignored() {
        let output = "{\"level\":\"INFO\",\"output_path\":\"/tmp/b.iso\"}\nwarning: cleanup skipped\n\n";
        assert_eq!(
            expect_field("iso auto", output, FIELD_OUTPUT_PATH).unwrap(),
            "/tmp/b.iso"
        );
    }

    #[test]
    fn test_unknown_status() {
        for output in ["", "\n\n", "plain text", "[1,2]", "{\"message\":\"no level\"}", "{\"level\":\"WARN\"}"] {
            let err = parse_output("helper", output).unwrap_err();
            assert!(matches!(err, CloudError::UnknownStatus(_)), "{output:?}");
        }
    }

    #[test]
    fn test_missing_field() {
        let output = "{\"level\":\"INFO\",\"message\":\"done\"}";
        let err = expect_field("iso get", output, FIELD_FILE).unwrap_err();
        assert!(matches!(err, CloudError::UnknownStatus(_)));
    }

    #[test]
    fn test_record_line() {
        let line = ResultRecord::new(Level::Info, EVENT_FETCH_SUCCESS, "done")
            .with(FIELD_FILE, "/tmp/a.iso")
            .to_line()
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["event"], "fetch_success");
        assert_eq!(value["file"], "/tmp/a.iso");
    }
}
