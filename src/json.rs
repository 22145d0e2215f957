//! JSON codec shim
//!
//! Thin layer over serde_json with the conventions the widget layer expects:
//! - `decode_safe` swallows malformed input and yields `None`
//! - dates are encoded as quoted `"YYYY-MM-DDTHH:MM:SS"` strings (UTC, via chrono)
//! - errors carry what was being done when they happened

use chrono::DateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Result type for codec operations
pub type JsonResult<T> = Result<T, JsonError>;

/// Codec failure
#[derive(Debug)]
pub enum JsonError {
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    /// Timestamp outside the representable date range
    DateRange(f64),
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonError::Encode(e) => write!(f, "JSON encode error: {}", e),
            JsonError::Decode(e) => write!(f, "JSON decode error: {}", e),
            JsonError::DateRange(ms) => write!(f, "timestamp out of range: {}", ms),
        }
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JsonError::Encode(e) | JsonError::Decode(e) => Some(e),
            JsonError::DateRange(_) => None,
        }
    }
}

/// Encode a value as compact JSON
pub fn encode<T: Serialize + ?Sized>(value: &T) -> JsonResult<String> {
    serde_json::to_string(value).map_err(JsonError::Encode)
}

/// Encode a value as indented JSON
pub fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> JsonResult<String> {
    serde_json::to_string_pretty(value).map_err(JsonError::Encode)
}

/// Decode JSON text into `T`
pub fn decode<T: DeserializeOwned>(text: &str) -> JsonResult<T> {
    serde_json::from_str(text).map_err(JsonError::Decode)
}

/// Decode JSON text, yielding `None` instead of an error
pub fn decode_safe(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Encode a timestamp (ms since the Unix epoch) as a quoted JSON date
/// string: `"2024-03-09T14:05:00"`. Sub-second precision is dropped.
pub fn encode_date(ms_since_epoch: f64) -> JsonResult<String> {
    if !ms_since_epoch.is_finite() {
        return Err(JsonError::DateRange(ms_since_epoch));
    }
    let date = DateTime::from_timestamp_millis(ms_since_epoch.floor() as i64)
        .ok_or(JsonError::DateRange(ms_since_epoch))?;
    Ok(format!("\"{}\"", date.format("%Y-%m-%dT%H:%M:%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Column {
        header: String,
        width: u32,
        hidden: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let col = Column {
            header: "Name".into(),
            width: 120,
            hidden: false,
        };
        let text = encode(&col).unwrap();
        assert_eq!(text, r#"{"header":"Name","width":120,"hidden":false}"#);
        assert_eq!(decode::<Column>(&text).unwrap(), col);
    }

    #[test]
    fn test_encode_pretty_is_indented() {
        let text = encode_pretty(&json!({"a": [1, 2]})).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(decode_safe(&text), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_decode_error_context() {
        let err = decode::<Column>("{\"header\": ").unwrap_err();
        assert!(matches!(err, JsonError::Decode(_)));
        assert!(err.to_string().starts_with("JSON decode error"));
    }

    #[test]
    fn test_decode_safe() {
        assert_eq!(decode_safe("[1, \"two\"]"), Some(json!([1, "two"])));
        assert_eq!(decode_safe("{not json"), None);
        assert_eq!(decode_safe(""), None);
    }

    #[test]
    fn test_encode_date() {
        assert_eq!(encode_date(0.0).unwrap(), "\"1970-01-01T00:00:00\"");
        // 2024-02-29T23:59:59.999Z
        assert_eq!(
            encode_date(1_709_251_199_999.0).unwrap(),
            "\"2024-02-29T23:59:59\""
        );
        // 2000-03-01T12:30:45Z
        assert_eq!(
            encode_date(951_913_845_000.0).unwrap(),
            "\"2000-03-01T12:30:45\""
        );
        // One second before the epoch
        assert_eq!(encode_date(-1000.0).unwrap(), "\"1969-12-31T23:59:59\"");
    }

    #[test]
    fn test_encode_date_out_of_range() {
        assert!(matches!(encode_date(f64::NAN), Err(JsonError::DateRange(_))));
        assert!(matches!(encode_date(f64::INFINITY), Err(JsonError::DateRange(_))));
        assert!(matches!(encode_date(1e20), Err(JsonError::DateRange(_))));
    }
}
